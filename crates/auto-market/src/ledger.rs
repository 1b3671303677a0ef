//! Seams to the ledger: order submission and token-account provisioning
//!
//! Both traits are shared by every agent task, so implementations must be
//! safe for concurrent use.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};

use crate::error::AutoMarketResult;
use crate::order::SwapOrder;

/// Submits signed orders and reads token balances
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Sign, send and wait for confirmation of a single swap order
    async fn submit_order(&self, order: &SwapOrder, signers: &[&Keypair]) -> AutoMarketResult<Signature>;

    /// Current balance of a token account, in base units
    async fn token_balance(&self, account: &Pubkey) -> AutoMarketResult<u64>;
}

/// Creates token accounts and tops up balances from a faucet authority.
///
/// Both operations are idempotent: re-running against existing accounts that
/// already meet the floor changes nothing.
#[async_trait]
pub trait TokenProvisioner: Send + Sync {
    /// Return the owner's token account for `mint`, creating it if needed
    async fn ensure_account(&self, owner: &Pubkey, mint: &Pubkey) -> AutoMarketResult<Pubkey>;

    /// Mint the shortfall if `account` holds less than `floor`.
    ///
    /// Returns the amount minted (zero when the floor is already met).
    async fn ensure_minimum_balance(&self, account: &Pubkey, mint: &Pubkey, floor: u64) -> AutoMarketResult<u64>;
}
