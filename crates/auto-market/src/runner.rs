//! Population runner: provisions N agents and drives one scheduler task per agent

use solana_sdk::signature::{Keypair, Signer};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent::AgentState;
use crate::config::{ProvisioningFailure, SimulationConfig};
use crate::error::{AutoMarketError, AutoMarketResult};
use crate::identity::KeyStore;
use crate::ledger::{LedgerClient, TokenProvisioner};
use crate::order::OrderSubmitter;
use crate::pool::PoolAddresses;
use crate::scheduler::{AgentReport, AgentScheduler, AgentStats, TradeEvent, TradingParams};
use crate::shutdown::ShutdownSignal;

/// Provisions and launches the agent population
pub struct PopulationRunner {
    config: SimulationConfig,
    params: TradingParams,
    key_store: KeyStore,
    pool: Arc<PoolAddresses>,
    ledger: Arc<dyn LedgerClient>,
    provisioner: Arc<dyn TokenProvisioner>,
    payer: Arc<Keypair>,
    events: Option<mpsc::UnboundedSender<TradeEvent>>,
    max_iterations: Option<u64>,
}

impl PopulationRunner {
    /// Validate `config` and prepare a runner. Nothing touches the ledger yet.
    pub fn new(
        config: SimulationConfig,
        key_store: KeyStore,
        pool: Arc<PoolAddresses>,
        ledger: Arc<dyn LedgerClient>,
        provisioner: Arc<dyn TokenProvisioner>,
        payer: Arc<Keypair>,
    ) -> AutoMarketResult<Self> {
        config.validate()?;
        let params = TradingParams::from_config(&config)?;

        Ok(Self {
            config,
            params,
            key_store,
            pool,
            ledger,
            provisioner,
            payer,
            events: None,
            max_iterations: None,
        })
    }

    /// Forward every agent's trade events to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<TradeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Let each agent stop on its own after this many attempts
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Provision one agent: identity, both token accounts, and the balance floor.
    ///
    /// Idempotent: a second call for the same index mints nothing once the
    /// floor is met and yields the same accounts.
    pub async fn provision_agent(&self, index: usize) -> AutoMarketResult<AgentState> {
        let name = KeyStore::agent_name(index);
        let fail = |e: AutoMarketError| AutoMarketError::provisioning(name.clone(), e);

        let identity = self.key_store.load_or_create_agent(index).map_err(fail)?;
        let owner = identity.pubkey();
        let floor = self.config.starting_balance_floor;

        let token_a = self
            .provisioner
            .ensure_account(&owner, &self.pool.mint_a)
            .await
            .map_err(fail)?;
        let token_b = self
            .provisioner
            .ensure_account(&owner, &self.pool.mint_b)
            .await
            .map_err(fail)?;

        for (account, mint) in [(&token_a, &self.pool.mint_a), (&token_b, &self.pool.mint_b)] {
            let minted = self
                .provisioner
                .ensure_minimum_balance(account, mint, floor)
                .await
                .map_err(fail)?;
            if minted > 0 {
                log::warn!("[{}] topped up {} with {} of mint {}", name, account, minted, mint);
            }
        }

        let balance_a = self.ledger.token_balance(&token_a).await.map_err(fail)?;
        let balance_b = self.ledger.token_balance(&token_b).await.map_err(fail)?;

        log::info!(
            "[{}] provisioned {} (A: {} = {}, B: {} = {})",
            name,
            owner,
            token_a,
            balance_a,
            token_b,
            balance_b
        );

        Ok(AgentState::new(
            name,
            Arc::new(identity),
            token_a,
            token_b,
            balance_a,
            balance_b,
        ))
    }

    /// Provision every agent in index order, applying the failure policy.
    ///
    /// Returns each surviving agent with its index.
    pub async fn provision(&self, shutdown: &ShutdownSignal) -> AutoMarketResult<Vec<(usize, AgentState)>> {
        let mut agents = Vec::with_capacity(self.config.agent_count);

        for index in 0..self.config.agent_count {
            if shutdown.is_triggered() {
                return Err(AutoMarketError::Shutdown);
            }

            match self.provision_agent(index).await {
                Ok(state) => agents.push((index, state)),
                Err(e) => match self.config.provisioning_failure {
                    ProvisioningFailure::Abort => return Err(e),
                    ProvisioningFailure::Skip => log::warn!("{}; skipping agent", e),
                },
            }
        }

        if agents.is_empty() {
            return Err(AutoMarketError::provisioning(
                "population",
                "no agent could be provisioned",
            ));
        }

        Ok(agents)
    }

    /// Provision the population and spawn one scheduler task per agent
    pub async fn launch(self, shutdown: ShutdownSignal) -> AutoMarketResult<RunningPopulation> {
        let agents = self.provision(&shutdown).await?;
        let submitter = OrderSubmitter::new(
            self.ledger.clone(),
            self.pool.clone(),
            self.payer.clone(),
            self.config.min_output_bps,
        );

        let mut handles = Vec::with_capacity(agents.len());
        for (index, state) in agents {
            let name = state.name().to_string();
            let mut scheduler = AgentScheduler::new(state, submitter.clone(), self.params.clone(), shutdown.clone())
                .with_seed(self.config.agent_seed(index));
            if let Some(events) = &self.events {
                scheduler = scheduler.with_events(events.clone());
            }
            if let Some(max_iterations) = self.max_iterations {
                scheduler = scheduler.with_max_iterations(max_iterations);
            }

            handles.push((name, tokio::spawn(scheduler.run())));
        }

        log::info!("Launched {} agents against pool {}", handles.len(), self.pool.pool);

        Ok(RunningPopulation { handles })
    }

    /// Provision, trade until shutdown, and report
    pub async fn run(self, shutdown: ShutdownSignal) -> AutoMarketResult<PopulationSummary> {
        let running = self.launch(shutdown).await?;
        Ok(running.join().await)
    }
}

/// Handles to the spawned agent tasks
pub struct RunningPopulation {
    handles: Vec<(String, JoinHandle<AgentReport>)>,
}

impl RunningPopulation {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every agent to stop
    pub async fn join(self) -> PopulationSummary {
        let mut summary = PopulationSummary::default();

        for (name, handle) in self.handles {
            match handle.await {
                Ok(report) => summary.agents.push(report),
                Err(e) => {
                    log::error!("[{}] agent task ended abnormally: {}", name, e);
                    summary.crashed.push(name);
                }
            }
        }

        summary
    }
}

/// End-of-run report over all agents
#[derive(Debug, Clone, Default)]
pub struct PopulationSummary {
    pub agents: Vec<AgentReport>,
    pub crashed: Vec<String>,
}

impl PopulationSummary {
    pub fn totals(&self) -> AgentStats {
        self.agents.iter().fold(AgentStats::default(), |mut total, report| {
            let stats = &report.stats;
            total.submitted += stats.submitted;
            total.filled += stats.filled;
            total.failed += stats.failed;
            total.skipped += stats.skipped;
            total.volume_atob = total.volume_atob.saturating_add(stats.volume_atob);
            total.volume_btoa = total.volume_btoa.saturating_add(stats.volume_btoa);
            total
        })
    }

    pub fn agent(&self, name: &str) -> Option<&AgentReport> {
        self.agents.iter().find(|report| report.name == name)
    }
}

impl fmt::Display for PopulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>9} {:>7} {:>7} {:>7} {:>14} {:>14} {:>14} {:>14}",
            "agent", "submitted", "filled", "failed", "skipped", "vol A->B", "vol B->A", "balance A", "balance B"
        )?;
        for report in &self.agents {
            let s = &report.stats;
            writeln!(
                f,
                "{:<10} {:>9} {:>7} {:>7} {:>7} {:>14} {:>14} {:>14} {:>14}",
                report.name,
                s.submitted,
                s.filled,
                s.failed,
                s.skipped,
                s.volume_atob,
                s.volume_btoa,
                report.balances.0,
                report.balances.1
            )?;
        }
        let t = self.totals();
        write!(
            f,
            "{:<10} {:>9} {:>7} {:>7} {:>7} {:>14} {:>14}",
            "total", t.submitted, t.filled, t.failed, t.skipped, t.volume_atob, t.volume_btoa
        )?;
        for name in &self.crashed {
            write!(f, "\n{} crashed", name)?;
        }
        Ok(())
    }
}
