//! Per-agent state: identity, token accounts and locally tracked balances
//!
//! Balances are an optimistic approximation. They move by exactly the traded
//! amount after each confirmed order and ignore fees and slippage, so they
//! drift from ledger truth over long runs until reconciled.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::sync::Arc;

use crate::direction::{Asset, Direction};

/// One simulated trader
#[derive(Debug, Clone)]
pub struct AgentState {
    name: String,
    identity: Arc<Keypair>,
    token_a: Pubkey,
    token_b: Pubkey,
    balance_a: u64,
    balance_b: u64,
}

impl AgentState {
    pub fn new(
        name: impl Into<String>,
        identity: Arc<Keypair>,
        token_a: Pubkey,
        token_b: Pubkey,
        balance_a: u64,
        balance_b: u64,
    ) -> Self {
        Self {
            name: name.into(),
            identity,
            token_a,
            token_b,
            balance_a,
            balance_b,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pubkey(&self) -> Pubkey {
        self.identity.pubkey()
    }

    pub fn identity(&self) -> &Keypair {
        &self.identity
    }

    pub fn token_account(&self, asset: Asset) -> Pubkey {
        match asset {
            Asset::A => self.token_a,
            Asset::B => self.token_b,
        }
    }

    pub fn balance(&self, asset: Asset) -> u64 {
        match asset {
            Asset::A => self.balance_a,
            Asset::B => self.balance_b,
        }
    }

    /// Tracked `(balance_a, balance_b)`
    pub fn balances(&self) -> (u64, u64) {
        (self.balance_a, self.balance_b)
    }

    /// Tracked balance of the asset `direction` sells
    pub fn source_balance(&self, direction: Direction) -> u64 {
        self.balance(direction.source())
    }

    /// Move `amount` from the source to the destination balance.
    ///
    /// The source saturates at zero. That only happens when the ledger
    /// confirmed an order larger than the tracked balance, which means the
    /// tracker had already drifted low.
    pub fn apply_trade(&mut self, direction: Direction, amount: u64) {
        let available = self.balance(direction.source());
        if amount > available {
            log::warn!(
                "[{}] {} of {} exceeds tracked balance {}, clamping at zero",
                self.name,
                direction,
                amount,
                available
            );
        }
        *self.balance_mut(direction.source()) = available.saturating_sub(amount);

        let destination = self.balance_mut(direction.destination());
        *destination = destination.saturating_add(amount);
    }

    /// Replace tracked balances with values read from the ledger
    pub fn reconcile(&mut self, balance_a: u64, balance_b: u64) {
        if (balance_a, balance_b) != (self.balance_a, self.balance_b) {
            log::debug!(
                "[{}] reconciled balances ({}, {}) -> ({}, {})",
                self.name,
                self.balance_a,
                self.balance_b,
                balance_a,
                balance_b
            );
        }
        self.balance_a = balance_a;
        self.balance_b = balance_b;
    }

    fn balance_mut(&mut self, asset: Asset) -> &mut u64 {
        match asset {
            Asset::A => &mut self.balance_a,
            Asset::B => &mut self.balance_b,
        }
    }
}
