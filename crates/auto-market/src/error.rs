//! Error types for the trading simulation

use solana_client::client_error::ClientError;
use solana_sdk::program_error::ProgramError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutoMarketError {
    /// Invalid parameters, fatal before any agent is provisioned
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Identity or token-account setup failed for an agent
    #[error("Provisioning failed for {agent}: {reason}")]
    Provisioning { agent: String, reason: String },

    /// Building, signing or confirming a single order failed
    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    #[error("Invalid sampling range: min={min}, max={max}")]
    InvalidRange { min: u64, max: u64 },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Instruction error: {0}")]
    Instruction(String),

    #[error("Shutdown requested")]
    Shutdown,
}

impl AutoMarketError {
    pub fn config(msg: impl Into<String>) -> Self {
        AutoMarketError::Configuration(msg.into())
    }

    pub fn provisioning(agent: impl Into<String>, reason: impl ToString) -> Self {
        AutoMarketError::Provisioning {
            agent: agent.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap any failure into an order submission error, without double wrapping
    pub fn into_order_submission(self) -> Self {
        match self {
            err @ AutoMarketError::OrderSubmission(_) => err,
            other => AutoMarketError::OrderSubmission(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AutoMarketError {
    fn from(err: std::io::Error) -> Self {
        AutoMarketError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for AutoMarketError {
    fn from(err: toml::de::Error) -> Self {
        AutoMarketError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for AutoMarketError {
    fn from(err: toml::ser::Error) -> Self {
        AutoMarketError::Parse(err.to_string())
    }
}

impl From<ClientError> for AutoMarketError {
    fn from(err: ClientError) -> Self {
        AutoMarketError::Rpc(err.to_string())
    }
}

impl From<ProgramError> for AutoMarketError {
    fn from(err: ProgramError) -> Self {
        AutoMarketError::Instruction(err.to_string())
    }
}

pub type AutoMarketResult<T> = Result<T, AutoMarketError>;
