// Run the agent population until Ctrl+C

use anyhow::{Context, Result};
use auto_market::{
    scale_amount, shutdown_channel, AutoMarketError, ClampMode, KeyStore, PopulationRunner,
    ProvisioningFailure, SimulationConfig,
};
use clap::{Args, ValueEnum};
use std::path::Path;
use std::sync::Arc;

use super::{
    utils::{connect, info, key_dir, load_payer, load_pool, success},
    GlobalArgs,
};

// Whole-token defaults used when no config file is given
const DEFAULT_AGENTS: usize = 5;
const DEFAULT_MINTING: f64 = 1e4;
const DEFAULT_MIN_TRADE: f64 = 1.0;
const DEFAULT_MAX_TRADE: f64 = 1e2;
const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;
const DEFAULT_MAX_INTERVAL_MS: u64 = 5_000;

#[derive(Clone, Copy, ValueEnum)]
pub enum ClampArg {
    Strict,
    Permissive,
}

impl From<ClampArg> for ClampMode {
    fn from(arg: ClampArg) -> Self {
        match arg {
            ClampArg::Strict => ClampMode::Strict,
            ClampArg::Permissive => ClampMode::Permissive,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ProvisioningArg {
    Abort,
    Skip,
}

impl From<ProvisioningArg> for ProvisioningFailure {
    fn from(arg: ProvisioningArg) -> Self {
        match arg {
            ProvisioningArg::Abort => ProvisioningFailure::Abort,
            ProvisioningArg::Skip => ProvisioningFailure::Skip,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CommitmentArg {
    Processed,
    Confirmed,
    Finalized,
}

impl CommitmentArg {
    fn as_str(self) -> &'static str {
        match self {
            CommitmentArg::Processed => "processed",
            CommitmentArg::Confirmed => "confirmed",
            CommitmentArg::Finalized => "finalized",
        }
    }
}

#[derive(Args)]
pub struct RunCmd {
    /// Configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Number of agents
    #[arg(short = 'n', long)]
    agents: Option<usize>,

    /// Balance floor per agent and asset, in whole tokens
    #[arg(short, long)]
    minting: Option<f64>,

    /// Smallest trade, in whole tokens
    #[arg(long)]
    min_trade_amount: Option<f64>,

    /// Largest trade, in whole tokens
    #[arg(long)]
    max_trade_amount: Option<f64>,

    /// Shortest wait between orders of one agent, in milliseconds
    #[arg(long)]
    min_trade_interval: Option<u64>,

    /// Longest wait between orders of one agent, in milliseconds
    #[arg(long)]
    max_trade_interval: Option<u64>,

    /// Decimals of both pool mints, used to scale whole-token amounts
    #[arg(long, default_value = "9")]
    decimals: u8,

    #[arg(long, value_enum)]
    clamp_mode: Option<ClampArg>,

    /// Minimum output as basis points of the input amount
    #[arg(long)]
    min_output_bps: Option<u16>,

    /// Seed agent RNGs for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Re-read on-chain balances every this many seconds
    #[arg(long)]
    reconcile_interval_secs: Option<u64>,

    /// What to do when an agent cannot be provisioned
    #[arg(long, value_enum)]
    provisioning_failure: Option<ProvisioningArg>,

    /// Commitment level for reads and confirmations
    #[arg(long, value_enum)]
    commitment: Option<CommitmentArg>,
}

impl RunCmd {
    /// Merge the optional config file with command-line overrides
    fn resolve_config(&self, global: &GlobalArgs) -> Result<SimulationConfig> {
        let file = match &self.config {
            Some(path) => Some(
                SimulationConfig::load(Path::new(path))
                    .with_context(|| format!("Failed to load config from {}", path))?,
            ),
            None => None,
        };
        let from_file = file.is_some();
        let mut config = file.unwrap_or_default();

        // Without a file, unset flags fall back to whole-token defaults
        let whole = |flag: Option<f64>, default: f64| flag.or((!from_file).then_some(default));

        if let Some(agents) = self.agents.or((!from_file).then_some(DEFAULT_AGENTS)) {
            config.agent_count = agents;
        }
        if let Some(minting) = whole(self.minting, DEFAULT_MINTING) {
            config.starting_balance_floor = scale_amount(minting, self.decimals)?;
        }
        if let Some(min) = whole(self.min_trade_amount, DEFAULT_MIN_TRADE) {
            config.min_trade_amount = scale_amount(min, self.decimals)?;
        }
        if let Some(max) = whole(self.max_trade_amount, DEFAULT_MAX_TRADE) {
            config.max_trade_amount = scale_amount(max, self.decimals)?;
        }
        if let Some(ms) = self.min_trade_interval.or((!from_file).then_some(DEFAULT_MIN_INTERVAL_MS)) {
            config.min_interval_ms = ms;
        }
        if let Some(ms) = self.max_trade_interval.or((!from_file).then_some(DEFAULT_MAX_INTERVAL_MS)) {
            config.max_interval_ms = ms;
        }
        if let Some(mode) = self.clamp_mode {
            config.clamp_mode = mode.into();
        }
        if let Some(bps) = self.min_output_bps {
            config.min_output_bps = bps;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.reconcile_interval_secs.is_some() {
            config.reconcile_interval_secs = self.reconcile_interval_secs;
        }
        if let Some(policy) = self.provisioning_failure {
            config.provisioning_failure = policy.into();
        }
        if let Some(commitment) = self.commitment {
            config.cluster.commitment = commitment.as_str().to_string();
        }
        if let Some(url) = &global.url {
            config.cluster.rpc_url = url.clone();
        }

        Ok(config)
    }
}

pub async fn execute(cmd: RunCmd, global: &GlobalArgs) -> Result<()> {
    let config = cmd.resolve_config(global)?;
    config.validate().context("Invalid simulation parameters")?;

    let payer = load_payer(&global.payer)?;
    let pool = Arc::new(load_pool(global)?);
    let ledger = Arc::new(connect(global, &config.cluster, payer.clone())?);

    info(&format!("Pool: {}", pool.pool));
    info(&format!(
        "{} agents, trades {}..{}, intervals {}..{} ms",
        config.agent_count,
        config.min_trade_amount,
        config.max_trade_amount,
        config.min_interval_ms,
        config.max_interval_ms
    ));

    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Ctrl+C received, stopping agents..."),
            Err(e) => log::error!("Failed to listen for Ctrl+C: {}; stopping", e),
        }
        trigger.trigger();
    });

    let runner = PopulationRunner::new(
        config,
        KeyStore::new(key_dir(global)?),
        pool,
        ledger.clone(),
        ledger,
        payer,
    )?;

    match runner.run(signal).await {
        Ok(summary) => {
            println!("{}", summary);
            success("All agents stopped");
            Ok(())
        }
        Err(AutoMarketError::Shutdown) => {
            info("Interrupted during provisioning");
            Ok(())
        }
        Err(e) => Err(e).context("Simulation failed"),
    }
}
