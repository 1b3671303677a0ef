//! Synthetic trading volume for a two-asset SPL token-swap pool.
//!
//! A population of independent agents, each with its own keypair and token
//! accounts, repeatedly swaps random log-uniform amounts in a direction
//! biased by its own holdings, at random log-uniform intervals.

pub mod agent;
pub mod config;
pub mod direction;
pub mod error;
pub mod identity;
pub mod ledger;
pub mod order;
pub mod pool;
pub mod rpc;
pub mod runner;
pub mod sampler;
pub mod scheduler;
pub mod shutdown;

pub use agent::AgentState;
pub use config::{create_example_config, scale_amount, ClampMode, ClusterConfig, ProvisioningFailure, SimulationConfig};
pub use direction::{Asset, Direction, DirectionPolicy, TradeIntent};
pub use error::{AutoMarketError, AutoMarketResult};
pub use identity::KeyStore;
pub use ledger::{LedgerClient, TokenProvisioner};
pub use order::{OrderSubmitter, SwapOrder};
pub use pool::{PoolAddresses, TOKEN_SWAP_PROGRAM_ID};
pub use rpc::RpcLedger;
pub use runner::{PopulationRunner, PopulationSummary, RunningPopulation};
pub use sampler::{sample_log_uniform, LogUniform};
pub use scheduler::{AgentReport, AgentScheduler, AgentStats, TradeEvent, TradeOutcome, TradingParams};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
