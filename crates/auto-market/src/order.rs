//! Swap order construction and submission

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use std::sync::Arc;

use crate::agent::AgentState;
use crate::direction::{Direction, TradeIntent};
use crate::error::AutoMarketResult;
use crate::ledger::LedgerClient;
use crate::pool::PoolAddresses;

/// Token-swap instruction tag for `Swap`
const SWAP_INSTRUCTION_TAG: u8 = 1;

/// A fully resolved swap against the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrder {
    pub swap_program_id: Pubkey,
    pub token_program_id: Pubkey,
    pub pool: Pubkey,
    pub authority: Pubkey,
    pub user_transfer_authority: Pubkey,
    pub user_source: Pubkey,
    pub pool_source: Pubkey,
    pub pool_destination: Pubkey,
    pub user_destination: Pubkey,
    pub lp_mint: Pubkey,
    pub fee_account: Pubkey,
    pub source_mint: Pubkey,
    pub destination_mint: Pubkey,
    pub direction: Direction,
    pub amount_in: u64,
    pub minimum_amount_out: u64,
}

impl SwapOrder {
    /// Resolve every account of a swap from the pool, the trader and a direction
    pub fn resolve(
        pool: &PoolAddresses,
        agent: &AgentState,
        intent: TradeIntent,
        minimum_amount_out: u64,
    ) -> Self {
        let source = intent.direction.source();
        let destination = intent.direction.destination();

        Self {
            swap_program_id: pool.swap_program_id,
            token_program_id: pool.token_program_id,
            pool: pool.pool,
            authority: pool.authority,
            user_transfer_authority: agent.pubkey(),
            user_source: agent.token_account(source),
            pool_source: pool.vault(source),
            pool_destination: pool.vault(destination),
            user_destination: agent.token_account(destination),
            lp_mint: pool.lp_mint,
            fee_account: pool.fee_account,
            source_mint: pool.mint(source),
            destination_mint: pool.mint(destination),
            direction: intent.direction,
            amount_in: intent.amount,
            minimum_amount_out,
        }
    }

    /// Tag byte followed by little-endian `amount_in` and `minimum_amount_out`
    pub fn instruction_data(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(17);
        data.push(SWAP_INSTRUCTION_TAG);
        data.extend_from_slice(&self.amount_in.to_le_bytes());
        data.extend_from_slice(&self.minimum_amount_out.to_le_bytes());
        data
    }

    /// Build the token-swap `Swap` instruction (no host fee account)
    pub fn to_instruction(&self) -> Instruction {
        let accounts = vec![
            AccountMeta::new_readonly(self.pool, false),
            AccountMeta::new_readonly(self.authority, false),
            AccountMeta::new_readonly(self.user_transfer_authority, true),
            AccountMeta::new(self.user_source, false),
            AccountMeta::new(self.pool_source, false),
            AccountMeta::new(self.pool_destination, false),
            AccountMeta::new(self.user_destination, false),
            AccountMeta::new(self.lp_mint, false),
            AccountMeta::new(self.fee_account, false),
            AccountMeta::new_readonly(self.source_mint, false),
            AccountMeta::new_readonly(self.destination_mint, false),
            // Source, destination and pool token programs are all classic SPL Token
            AccountMeta::new_readonly(self.token_program_id, false),
            AccountMeta::new_readonly(self.token_program_id, false),
            AccountMeta::new_readonly(self.token_program_id, false),
        ];

        Instruction {
            program_id: self.swap_program_id,
            accounts,
            data: self.instruction_data(),
        }
    }
}

/// Minimum output as basis points of the input amount
pub fn minimum_output(amount_in: u64, min_output_bps: u16) -> u64 {
    let minimum = amount_in as u128 * min_output_bps as u128 / 10_000;
    u64::try_from(minimum).unwrap_or(u64::MAX)
}

/// Builds and submits one swap per call for any agent.
///
/// Suspends only the calling agent while waiting for confirmation and never
/// retries; retry policy belongs to the caller.
#[derive(Clone)]
pub struct OrderSubmitter {
    ledger: Arc<dyn LedgerClient>,
    pool: Arc<PoolAddresses>,
    payer: Arc<Keypair>,
    min_output_bps: u16,
}

impl OrderSubmitter {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        pool: Arc<PoolAddresses>,
        payer: Arc<Keypair>,
        min_output_bps: u16,
    ) -> Self {
        Self {
            ledger,
            pool,
            payer,
            min_output_bps,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    pub fn build_order(&self, agent: &AgentState, intent: TradeIntent) -> SwapOrder {
        let minimum_amount_out = minimum_output(intent.amount, self.min_output_bps);
        SwapOrder::resolve(&self.pool, agent, intent, minimum_amount_out)
    }

    /// Submit `intent` for `agent`; the payer covers fees and the agent authorizes the transfer
    pub async fn submit(&self, agent: &AgentState, intent: TradeIntent) -> AutoMarketResult<Signature> {
        let order = self.build_order(agent, intent);
        self.ledger
            .submit_order(&order, &[self.payer.as_ref(), agent.identity()])
            .await
            .map_err(|e| e.into_order_submission())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::direction::Asset;
    use crate::pool::TOKEN_SWAP_PROGRAM_ID;

    fn pool() -> PoolAddresses {
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

    fn agent() -> AgentState {
        AgentState::new(
            "agent_000",
            Arc::new(Keypair::new()),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            1_000,
            1_000,
        )
    }

    #[test]
    fn test_resolve_atob() {
        let pool = pool();
        let agent = agent();
        let intent = TradeIntent { direction: Direction::AtoB, amount: 42 };

        let order = SwapOrder::resolve(&pool, &agent, intent, 0);
        assert_eq!(order.user_source, agent.token_account(Asset::A));
        assert_eq!(order.user_destination, agent.token_account(Asset::B));
        assert_eq!(order.pool_source, pool.vault_a);
        assert_eq!(order.pool_destination, pool.vault_b);
        assert_eq!(order.source_mint, pool.mint_a);
        assert_eq!(order.destination_mint, pool.mint_b);
        assert_eq!(order.user_transfer_authority, agent.pubkey());
    }

    #[test]
    fn test_resolve_btoa_reverses_sides() {
        let pool = pool();
        let agent = agent();
        let intent = TradeIntent { direction: Direction::BtoA, amount: 42 };

        let order = SwapOrder::resolve(&pool, &agent, intent, 0);
        assert_eq!(order.user_source, agent.token_account(Asset::B));
        assert_eq!(order.pool_source, pool.vault_b);
        assert_eq!(order.pool_destination, pool.vault_a);
        assert_eq!(order.source_mint, pool.mint_b);
    }

    #[test]
    fn test_instruction_layout() {
        let pool = pool();
        let agent = agent();
        let intent = TradeIntent { direction: Direction::AtoB, amount: 0x0102 };
        let ix = SwapOrder::resolve(&pool, &agent, intent, 7).to_instruction();

        assert_eq!(ix.program_id, TOKEN_SWAP_PROGRAM_ID);
        assert_eq!(ix.data.len(), 17);
        assert_eq!(ix.data[0], SWAP_INSTRUCTION_TAG);
        assert_eq!(&ix.data[1..9], &0x0102u64.to_le_bytes());
        assert_eq!(&ix.data[9..17], &7u64.to_le_bytes());

        assert_eq!(ix.accounts.len(), 14);
        assert_eq!(ix.accounts[0].pubkey, pool.pool);
        let authority = &ix.accounts[2];
        assert_eq!(authority.pubkey, agent.pubkey());
        assert!(authority.is_signer);
        assert!(!authority.is_writable);
        assert!(ix.accounts[3].is_writable);
        assert!(!ix.accounts[9].is_writable);
        let signers = ix.accounts.iter().filter(|m| m.is_signer).count();
        assert_eq!(signers, 1);
    }

    #[test]
    fn test_minimum_output() {
        assert_eq!(minimum_output(1_000, 0), 0);
        assert_eq!(minimum_output(1_000, 9_500), 950);
        assert_eq!(minimum_output(u64::MAX, 10_000), u64::MAX);
    }

    #[test]
    fn test_minimum_output_saturates_above_full_output() {
        assert_eq!(minimum_output(u64::MAX, 10_001), u64::MAX);
        assert_eq!(minimum_output(u64::MAX, u16::MAX), u64::MAX);
        assert_eq!(minimum_output(10_000, 20_000), 20_000);
    }
}
