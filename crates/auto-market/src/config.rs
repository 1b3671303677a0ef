use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::CommitmentConfig;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{AutoMarketError, AutoMarketResult};

/// How the sampled amount relates to the tracked source balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClampMode {
    /// Clamp to the tracked source balance; skip the order when it is empty
    #[default]
    Strict,
    /// Submit the sampled amount and let the ledger reject what cannot be paid
    Permissive,
}

/// What to do when a single agent fails to provision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisioningFailure {
    /// Stop the whole run
    #[default]
    Abort,
    /// Log, drop the agent and continue with the rest
    Skip,
}

/// Simulation configuration, validated once and cloned into every agent.
///
/// All amounts are in base units of the traded tokens.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Number of agents to launch
    pub agent_count: usize,

    /// Each agent is topped up to at least this much of both assets
    pub starting_balance_floor: u64,

    /// Smallest sampled trade
    pub min_trade_amount: u64,

    /// Largest sampled trade
    pub max_trade_amount: u64,

    /// Shortest wait between two orders of one agent
    pub min_interval_ms: u64,

    /// Longest wait between two orders of one agent
    pub max_interval_ms: u64,

    #[serde(default)]
    pub clamp_mode: ClampMode,

    /// Minimum output as basis points of the input (0 disables slippage protection)
    #[serde(default)]
    pub min_output_bps: u16,

    /// Re-read true balances from the ledger on this period
    #[serde(default)]
    pub reconcile_interval_secs: Option<u64>,

    #[serde(default)]
    pub provisioning_failure: ProvisioningFailure,

    /// Base RNG seed; agent `i` uses `seed + i`
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub cluster: ClusterConfig,
}

/// RPC connection settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClusterConfig {
    pub rpc_url: String,

    /// One of `processed`, `confirmed`, `finalized`
    pub commitment: String,
}

impl SimulationConfig {
    /// Load configuration from TOML file
    pub fn load(path: &Path) -> AutoMarketResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AutoMarketError::Io(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: SimulationConfig = toml::from_str(&content).map_err(|e| {
            AutoMarketError::Parse(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &Path) -> AutoMarketResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            AutoMarketError::Io(format!("Failed to write config file {}: {}", path.display(), e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> AutoMarketResult<()> {
        if self.agent_count == 0 {
            return Err(AutoMarketError::config("agent_count must be greater than 0"));
        }

        if self.min_trade_amount == 0 {
            return Err(AutoMarketError::config("min_trade_amount must be greater than 0"));
        }

        if self.min_trade_amount >= self.max_trade_amount {
            return Err(AutoMarketError::config(format!(
                "min_trade_amount ({}) must be smaller than max_trade_amount ({})",
                self.min_trade_amount, self.max_trade_amount
            )));
        }

        if self.min_interval_ms == 0 {
            return Err(AutoMarketError::config("min_interval_ms must be greater than 0"));
        }

        if self.max_interval_ms < self.min_interval_ms {
            return Err(AutoMarketError::config(format!(
                "max_interval_ms ({}) must be at least min_interval_ms ({})",
                self.max_interval_ms, self.min_interval_ms
            )));
        }

        if self.min_output_bps > 10_000 {
            return Err(AutoMarketError::config(format!(
                "min_output_bps ({}) must be at most 10000",
                self.min_output_bps
            )));
        }

        if self.reconcile_interval_secs == Some(0) {
            return Err(AutoMarketError::config("reconcile_interval_secs must be greater than 0"));
        }

        self.cluster.validate()?;

        if self.starting_balance_floor <= self.min_trade_amount
            || self.starting_balance_floor >= self.max_trade_amount
        {
            log::warn!(
                "starting_balance_floor ({}) is outside ({}, {}); agents may idle or overdraw",
                self.starting_balance_floor,
                self.min_trade_amount,
                self.max_trade_amount
            );
        }

        Ok(())
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        self.reconcile_interval_secs.map(Duration::from_secs)
    }

    /// Seed for agent `index`, if seeding is enabled
    pub fn agent_seed(&self, index: usize) -> Option<u64> {
        self.seed.map(|seed| seed.wrapping_add(index as u64))
    }
}

impl ClusterConfig {
    fn validate(&self) -> AutoMarketResult<()> {
        if self.rpc_url.is_empty() {
            return Err(AutoMarketError::config("rpc_url must not be empty"));
        }
        self.commitment_config()?;
        Ok(())
    }

    pub fn commitment_config(&self) -> AutoMarketResult<CommitmentConfig> {
        match self.commitment.as_str() {
            "processed" => Ok(CommitmentConfig::processed()),
            "confirmed" => Ok(CommitmentConfig::confirmed()),
            "finalized" => Ok(CommitmentConfig::finalized()),
            other => Err(AutoMarketError::config(format!("Unknown commitment level: {}", other))),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            agent_count: 5,
            starting_balance_floor: 10_000,
            min_trade_amount: 1,
            max_trade_amount: 100,
            min_interval_ms: 1_000,
            max_interval_ms: 5_000,
            clamp_mode: ClampMode::default(),
            min_output_bps: 0,
            reconcile_interval_secs: None,
            provisioning_failure: ProvisioningFailure::default(),
            seed: None,
            cluster: ClusterConfig::default(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8899".to_string(),
            commitment: "confirmed".to_string(),
        }
    }
}

/// Convert a whole-token amount into base units for a mint with `decimals`
pub fn scale_amount(tokens: f64, decimals: u8) -> AutoMarketResult<u64> {
    if !tokens.is_finite() || tokens < 0.0 {
        return Err(AutoMarketError::config(format!("Invalid token amount: {}", tokens)));
    }

    let scaled = (tokens * 10f64.powi(decimals as i32)).round();
    if scaled >= u64::MAX as f64 {
        return Err(AutoMarketError::config(format!(
            "Token amount {} overflows with {} decimals",
            tokens, decimals
        )));
    }

    Ok(scaled as u64)
}

/// Create example configuration file
pub fn create_example_config(path: &Path) -> AutoMarketResult<()> {
    // 9-decimal tokens: floor of 50 whole tokens, trades between 1 and 100
    let example_config = SimulationConfig {
        agent_count: 5,
        starting_balance_floor: 50_000_000_000,
        min_trade_amount: 1_000_000_000,
        max_trade_amount: 100_000_000_000,
        min_interval_ms: 1_000,
        max_interval_ms: 5_000,
        clamp_mode: ClampMode::Strict,
        min_output_bps: 0,
        reconcile_interval_secs: Some(300),
        provisioning_failure: ProvisioningFailure::Abort,
        seed: None,
        cluster: ClusterConfig::default(),
    };

    example_config.save(path)
}
