//! In-memory ledger shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use auto_market::{
    AutoMarketError, AutoMarketResult, KeyStore, LedgerClient, PoolAddresses, SimulationConfig,
    SwapOrder, TokenProvisioner, TOKEN_SWAP_PROGRAM_ID,
};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Swaps 1:1 between an agent's own token accounts after an optional delay.
///
/// A 1:1 fill keeps the ledger in lockstep with the optimistic tracker, so
/// tests can compare the two directly.
#[derive(Default)]
pub struct StubLedger {
    balances: Mutex<HashMap<Pubkey, u64>>,
    accounts: Mutex<HashMap<(Pubkey, Pubkey), Pubkey>>,
    confirm_delay: Duration,
    reject_every: Option<u64>,
    fail_account_call: Option<u64>,
    submissions: AtomicU64,
    rejections: AtomicU64,
    account_calls: AtomicU64,
    provisioning_calls: AtomicU64,
    minted: AtomicU64,
}

impl StubLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    /// Reject every `n`th order, counted across all agents
    pub fn rejecting_every(mut self, n: u64) -> Self {
        self.reject_every = Some(n);
        self
    }

    /// Fail the `n`th `ensure_account` call (1-based)
    pub fn failing_account_call(mut self, n: u64) -> Self {
        self.fail_account_call = Some(n);
        self
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn rejections(&self) -> u64 {
        self.rejections.load(Ordering::SeqCst)
    }

    pub fn provisioning_calls(&self) -> u64 {
        self.provisioning_calls.load(Ordering::SeqCst)
    }

    pub fn minted(&self) -> u64 {
        self.minted.load(Ordering::SeqCst)
    }

    pub fn balance_of(&self, account: &Pubkey) -> Option<u64> {
        self.balances.lock().unwrap().get(account).copied()
    }

    pub fn total_balance(&self) -> u64 {
        self.balances.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl LedgerClient for StubLedger {
    async fn submit_order(&self, order: &SwapOrder, signers: &[&Keypair]) -> AutoMarketResult<Signature> {
        let sequence = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;

        if !signers.iter().any(|s| s.pubkey() == order.user_transfer_authority) {
            return Err(AutoMarketError::Rpc("missing transfer authority signature".to_string()));
        }

        if !self.confirm_delay.is_zero() {
            tokio::time::sleep(self.confirm_delay).await;
        }

        if self.reject_every.is_some_and(|n| sequence % n == 0) {
            self.rejections.fetch_add(1, Ordering::SeqCst);
            return Err(AutoMarketError::Rpc(format!("order {} rejected", sequence)));
        }

        let mut balances = self.balances.lock().unwrap();
        let source = balances
            .get_mut(&order.user_source)
            .ok_or_else(|| AutoMarketError::Rpc("unknown source account".to_string()))?;
        if *source < order.amount_in {
            return Err(AutoMarketError::Rpc("insufficient funds".to_string()));
        }
        *source -= order.amount_in;
        *balances.entry(order.user_destination).or_insert(0) += order.amount_in;

        Ok(Signature::new_unique())
    }

    async fn token_balance(&self, account: &Pubkey) -> AutoMarketResult<u64> {
        self.balance_of(account)
            .ok_or_else(|| AutoMarketError::Rpc(format!("account {} not found", account)))
    }
}

#[async_trait]
impl TokenProvisioner for StubLedger {
    async fn ensure_account(&self, owner: &Pubkey, mint: &Pubkey) -> AutoMarketResult<Pubkey> {
        self.provisioning_calls.fetch_add(1, Ordering::SeqCst);
        let call = self.account_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_account_call == Some(call) {
            return Err(AutoMarketError::Rpc("account creation failed".to_string()));
        }

        let account = *self
            .accounts
            .lock()
            .unwrap()
            .entry((*owner, *mint))
            .or_insert_with(Pubkey::new_unique);
        self.balances.lock().unwrap().entry(account).or_insert(0);
        Ok(account)
    }

    async fn ensure_minimum_balance(&self, account: &Pubkey, _mint: &Pubkey, floor: u64) -> AutoMarketResult<u64> {
        self.provisioning_calls.fetch_add(1, Ordering::SeqCst);
        let mut balances = self.balances.lock().unwrap();
        let balance = balances
            .get_mut(account)
            .ok_or_else(|| AutoMarketError::Rpc(format!("account {} not found", account)))?;
        if *balance >= floor {
            return Ok(0);
        }

        let shortfall = floor - *balance;
        *balance = floor;
        self.minted.fetch_add(shortfall, Ordering::SeqCst);
        Ok(shortfall)
    }
}

pub fn test_pool() -> PoolAddresses {
    PoolAddresses {
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
    }
}

/// 3 agents, floor 1000, amounts 1..100, intervals 10..20 ms, seeded
pub fn test_config() -> SimulationConfig {
    SimulationConfig {
        agent_count: 3,
        starting_balance_floor: 1_000,
        min_trade_amount: 1,
        max_trade_amount: 100,
        min_interval_ms: 10,
        max_interval_ms: 20,
        seed: Some(42),
        ..Default::default()
    }
}

pub fn key_store() -> (TempDir, KeyStore) {
    let dir = TempDir::new().unwrap();
    let store = KeyStore::new(dir.path());
    (dir, store)
}
