//! Per-agent trading loop
//!
//! Each agent runs an explicit state machine:
//! `Waiting -> Trading -> (Success | Failed) -> Waiting`, until the shared
//! shutdown signal fires. The signal is observed while waiting and again
//! right before each order; an order already in flight runs to completion.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::agent::AgentState;
use crate::config::{ClampMode, SimulationConfig};
use crate::direction::{Asset, Direction, DirectionPolicy, TradeIntent};
use crate::error::{AutoMarketError, AutoMarketResult};
use crate::order::OrderSubmitter;
use crate::sampler::LogUniform;
use crate::shutdown::ShutdownSignal;

/// Sampling and clamping parameters shared by every agent
#[derive(Debug, Clone)]
pub struct TradingParams {
    pub amounts: LogUniform,
    pub intervals_ms: LogUniform,
    pub clamp_mode: ClampMode,
    pub reconcile_interval: Option<Duration>,
}

impl TradingParams {
    pub fn from_config(config: &SimulationConfig) -> AutoMarketResult<Self> {
        Ok(Self {
            amounts: LogUniform::new(config.min_trade_amount, config.max_trade_amount)?,
            intervals_ms: LogUniform::new(config.min_interval_ms, config.max_interval_ms)?,
            clamp_mode: config.clamp_mode,
            reconcile_interval: config.reconcile_interval(),
        })
    }
}

/// What happened to one trading attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeOutcome {
    Filled {
        direction: Direction,
        amount: u64,
        signature: Signature,
    },
    Failed {
        direction: Direction,
        amount: u64,
        error: String,
    },
    /// Strict clamp left nothing to sell
    Skipped { direction: Direction },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEvent {
    pub agent: String,
    pub outcome: TradeOutcome,
}

/// Counters kept by one agent over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    pub submitted: u64,
    pub filled: u64,
    pub failed: u64,
    pub skipped: u64,
    pub volume_atob: u64,
    pub volume_btoa: u64,
}

impl AgentStats {
    /// Filled input volume in `direction`
    pub fn volume(&self, direction: Direction) -> u64 {
        match direction {
            Direction::AtoB => self.volume_atob,
            Direction::BtoA => self.volume_btoa,
        }
    }

    fn record_fill(&mut self, direction: Direction, amount: u64) {
        self.filled += 1;
        match direction {
            Direction::AtoB => self.volume_atob = self.volume_atob.saturating_add(amount),
            Direction::BtoA => self.volume_btoa = self.volume_btoa.saturating_add(amount),
        }
    }
}

/// Final state of an agent once its loop has stopped
#[derive(Debug, Clone)]
pub struct AgentReport {
    pub name: String,
    pub pubkey: Pubkey,
    pub stats: AgentStats,
    pub balances: (u64, u64),
}

enum SchedulerPhase {
    Waiting,
    Trading,
    Success { intent: TradeIntent, signature: Signature },
    Failed { intent: TradeIntent, error: AutoMarketError },
    Stopped,
}

/// Drives one agent until shutdown
pub struct AgentScheduler {
    state: AgentState,
    submitter: OrderSubmitter,
    params: TradingParams,
    policy: DirectionPolicy,
    rng: StdRng,
    shutdown: ShutdownSignal,
    events: Option<mpsc::UnboundedSender<TradeEvent>>,
    stats: AgentStats,
    max_iterations: Option<u64>,
    iterations: u64,
    last_reconcile: Instant,
}

impl AgentScheduler {
    pub fn new(
        state: AgentState,
        submitter: OrderSubmitter,
        params: TradingParams,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            state,
            submitter,
            params,
            policy: DirectionPolicy::new(),
            rng: StdRng::from_entropy(),
            shutdown,
            events: None,
            stats: AgentStats::default(),
            max_iterations: None,
            iterations: 0,
            last_reconcile: Instant::now(),
        }
    }

    /// Use a deterministic RNG when `seed` is set
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    /// Publish every trading outcome to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<TradeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Stop on its own after this many trading attempts (submitted or skipped)
    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub async fn run(mut self) -> AgentReport {
        log::debug!("[{}] scheduler started", self.state.name());

        let mut phase = SchedulerPhase::Waiting;
        loop {
            phase = match phase {
                SchedulerPhase::Waiting => self.wait().await,
                SchedulerPhase::Trading => self.trade().await,
                SchedulerPhase::Success { intent, signature } => {
                    self.on_success(intent, signature);
                    self.next_round()
                }
                SchedulerPhase::Failed { intent, error } => {
                    self.on_failure(intent, error);
                    self.next_round()
                }
                SchedulerPhase::Stopped => break,
            };
        }

        log::debug!(
            "[{}] scheduler stopped after {} orders ({} filled, {} failed)",
            self.state.name(),
            self.stats.submitted,
            self.stats.filled,
            self.stats.failed
        );

        AgentReport {
            name: self.state.name().to_string(),
            pubkey: self.state.pubkey(),
            stats: self.stats,
            balances: self.state.balances(),
        }
    }

    async fn wait(&mut self) -> SchedulerPhase {
        let delay = Duration::from_millis(self.rng.sample(&self.params.intervals_ms));

        tokio::select! {
            _ = tokio::time::sleep(delay) => SchedulerPhase::Trading,
            _ = self.shutdown.triggered() => SchedulerPhase::Stopped,
        }
    }

    async fn trade(&mut self) -> SchedulerPhase {
        if self.shutdown.is_triggered() {
            return SchedulerPhase::Stopped;
        }

        self.maybe_reconcile().await;

        let direction = if self.stats.filled == 0 {
            self.policy.choose_uniform(&mut self.rng)
        } else {
            let (balance_a, balance_b) = self.state.balances();
            self.policy.choose(&mut self.rng, balance_a, balance_b)
        };

        let sampled: u64 = self.rng.sample(&self.params.amounts);
        let amount = match self.params.clamp_mode {
            ClampMode::Strict => sampled.min(self.state.source_balance(direction)),
            ClampMode::Permissive => sampled,
        };

        self.iterations += 1;

        if amount == 0 {
            log::debug!("[{}] no {:?} to sell, skipping {}", self.state.name(), direction.source(), direction);
            self.stats.skipped += 1;
            self.emit(TradeOutcome::Skipped { direction });
            return self.next_round();
        }

        let intent = TradeIntent { direction, amount };
        self.stats.submitted += 1;

        match self.submitter.submit(&self.state, intent).await {
            Ok(signature) => SchedulerPhase::Success { intent, signature },
            Err(error) => SchedulerPhase::Failed { intent, error },
        }
    }

    fn on_success(&mut self, intent: TradeIntent, signature: Signature) {
        self.state.apply_trade(intent.direction, intent.amount);
        self.stats.record_fill(intent.direction, intent.amount);

        log::info!(
            "[{}] {} {} ({})",
            self.state.name(),
            intent.direction,
            intent.amount,
            signature
        );

        self.emit(TradeOutcome::Filled {
            direction: intent.direction,
            amount: intent.amount,
            signature,
        });
    }

    fn on_failure(&mut self, intent: TradeIntent, error: AutoMarketError) {
        self.stats.failed += 1;

        log::error!("[{}] trade failed: {}", self.state.name(), error);

        self.emit(TradeOutcome::Failed {
            direction: intent.direction,
            amount: intent.amount,
            error: error.to_string(),
        });
    }

    fn next_round(&self) -> SchedulerPhase {
        match self.max_iterations {
            Some(max) if self.iterations >= max => SchedulerPhase::Stopped,
            _ => SchedulerPhase::Waiting,
        }
    }

    async fn maybe_reconcile(&mut self) {
        let Some(period) = self.params.reconcile_interval else {
            return;
        };
        if self.last_reconcile.elapsed() < period {
            return;
        }
        self.last_reconcile = Instant::now();

        match self.read_balances().await {
            Ok((balance_a, balance_b)) => self.state.reconcile(balance_a, balance_b),
            Err(e) => log::warn!("[{}] balance reconciliation failed: {}", self.state.name(), e),
        }
    }

    async fn read_balances(&self) -> AutoMarketResult<(u64, u64)> {
        let ledger = self.submitter.ledger();
        let balance_a = ledger.token_balance(&self.state.token_account(Asset::A)).await?;
        let balance_b = ledger.token_balance(&self.state.token_account(Asset::B)).await?;
        Ok((balance_a, balance_b))
    }

    fn emit(&self, outcome: TradeOutcome) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = events.send(TradeEvent {
                agent: self.state.name().to_string(),
                outcome,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerClient;
    use crate::order::SwapOrder;
    use crate::pool::{PoolAddresses, TOKEN_SWAP_PROGRAM_ID};
    use crate::shutdown::shutdown_channel;
    use async_trait::async_trait;
    use solana_sdk::signature::Keypair;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingLedger {
        reject_all: bool,
        calls: AtomicU64,
        orders: Mutex<Vec<SwapOrder>>,
        balances: (u64, u64),
        accounts: Mutex<Option<(Pubkey, Pubkey)>>,
    }

    #[async_trait]
    impl LedgerClient for RecordingLedger {
        async fn submit_order(&self, order: &SwapOrder, signers: &[&Keypair]) -> AutoMarketResult<Signature> {
            assert_eq!(signers.len(), 2);
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_all {
                return Err(AutoMarketError::Rpc("insufficient funds".to_string()));
            }
            self.orders.lock().unwrap().push(order.clone());
            Ok(Signature::new_unique())
        }

        async fn token_balance(&self, account: &Pubkey) -> AutoMarketResult<u64> {
            let accounts = (*self.accounts.lock().unwrap()).expect("accounts registered");
            if *account == accounts.0 {
                Ok(self.balances.0)
            } else {
                Ok(self.balances.1)
            }
        }
    }

    fn pool() -> Arc<PoolAddresses> {
        Arc::new(PoolAddresses {
            pool: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            vault_a: Pubkey::new_unique(),
            vault_b: Pubkey::new_unique(),
            lp_mint: Pubkey::new_unique(),
            fee_account: Pubkey::new_unique(),
            mint_a: Pubkey::new_unique(),
            mint_b: Pubkey::new_unique(),
            swap_program_id: TOKEN_SWAP_PROGRAM_ID,
            token_program_id: spl_token::id(),
        })
    }

    fn params(clamp_mode: ClampMode) -> TradingParams {
        TradingParams {
            amounts: LogUniform::new(1, 100).unwrap(),
            intervals_ms: LogUniform::new(10, 20).unwrap(),
            clamp_mode,
            reconcile_interval: None,
        }
    }

    fn scheduler(
        ledger: Arc<RecordingLedger>,
        params: TradingParams,
        balances: (u64, u64),
        shutdown: ShutdownSignal,
    ) -> AgentScheduler {
        let state = AgentState::new(
            "agent_000",
            Arc::new(Keypair::new()),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            balances.0,
            balances.1,
        );
        *ledger.accounts.lock().unwrap() = Some((state.token_account(Asset::A), state.token_account(Asset::B)));
        let submitter = OrderSubmitter::new(ledger, pool(), Arc::new(Keypair::new()), 0);
        AgentScheduler::new(state, submitter, params, shutdown).with_seed(Some(7))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fills_update_tracked_balances() {
        let ledger = Arc::new(RecordingLedger::default());
        let (_trigger, signal) = shutdown_channel();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = scheduler(ledger.clone(), params(ClampMode::Strict), (1_000, 1_000), signal)
            .with_events(tx)
            .with_max_iterations(10)
            .run()
            .await;

        assert_eq!(report.stats.submitted, 10);
        assert_eq!(report.stats.filled, 10);
        assert_eq!(report.balances.0 + report.balances.1, 2_000);

        let mut expected = (1_000u64, 1_000u64);
        while let Ok(event) = rx.try_recv() {
            match event.outcome {
                TradeOutcome::Filled { direction: Direction::AtoB, amount, .. } => {
                    expected = (expected.0 - amount, expected.1 + amount)
                }
                TradeOutcome::Filled { direction: Direction::BtoA, amount, .. } => {
                    expected = (expected.0 + amount, expected.1 - amount)
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!(report.balances, expected);
        assert_eq!(ledger.orders.lock().unwrap().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_leave_balances_untouched() {
        let ledger = Arc::new(RecordingLedger {
            reject_all: true,
            ..Default::default()
        });
        let (_trigger, signal) = shutdown_channel();

        let report = scheduler(ledger.clone(), params(ClampMode::Strict), (500, 700), signal)
            .with_max_iterations(5)
            .run()
            .await;

        assert_eq!(report.stats.failed, 5);
        assert_eq!(report.stats.filled, 0);
        assert_eq!(report.balances, (500, 700));
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_order() {
        let ledger = Arc::new(RecordingLedger::default());
        let (trigger, signal) = shutdown_channel();
        trigger.trigger();

        let report = scheduler(ledger.clone(), params(ClampMode::Strict), (100, 100), signal)
            .run()
            .await;

        assert_eq!(report.stats, AgentStats::default());
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_waiting() {
        let ledger = Arc::new(RecordingLedger::default());
        let (trigger, signal) = shutdown_channel();

        let handle = tokio::spawn(
            scheduler(ledger.clone(), params(ClampMode::Strict), (100, 100), signal).run(),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.trigger();

        let report = handle.await.unwrap();
        let submitted = report.stats.submitted;
        assert!(submitted > 0);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), submitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_clamp_skips_empty_agent() {
        let ledger = Arc::new(RecordingLedger::default());
        let (_trigger, signal) = shutdown_channel();

        let report = scheduler(ledger.clone(), params(ClampMode::Strict), (0, 0), signal)
            .with_max_iterations(4)
            .run()
            .await;

        assert_eq!(report.stats.skipped, 4);
        assert_eq!(report.stats.submitted, 0);
        assert_eq!(ledger.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_clamp_limits_amount_to_balance() {
        let ledger = Arc::new(RecordingLedger::default());
        let (_trigger, signal) = shutdown_channel();

        let report = scheduler(ledger.clone(), params(ClampMode::Strict), (3, 3), signal)
            .with_max_iterations(20)
            .run()
            .await;

        for order in ledger.orders.lock().unwrap().iter() {
            assert!(order.amount_in <= 6);
        }
        assert_eq!(report.balances.0 + report.balances.1, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permissive_submits_unaffordable_amounts() {
        let ledger = Arc::new(RecordingLedger::default());
        let (_trigger, signal) = shutdown_channel();

        let report = scheduler(ledger.clone(), params(ClampMode::Permissive), (0, 0), signal)
            .with_max_iterations(3)
            .run()
            .await;

        assert_eq!(report.stats.submitted, 3);
        assert_eq!(report.stats.skipped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_reads_ledger_balances() {
        let ledger = Arc::new(RecordingLedger {
            reject_all: true,
            balances: (42, 58),
            ..Default::default()
        });
        let (_trigger, signal) = shutdown_channel();
        let mut params = params(ClampMode::Strict);
        params.reconcile_interval = Some(Duration::from_millis(5));

        let report = scheduler(ledger, params, (1_000, 1_000), signal)
            .with_max_iterations(1)
            .run()
            .await;

        assert_eq!(report.balances, (42, 58));
    }
}
