//! JSON-RPC backed ledger client and token provisioner

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::sync::Arc;

use crate::error::{AutoMarketError, AutoMarketResult};
use crate::ledger::{LedgerClient, TokenProvisioner};
use crate::order::SwapOrder;

/// Talks to a cluster through the nonblocking RPC client.
///
/// The payer funds every transaction and is the mint authority used for
/// balance top-ups.
pub struct RpcLedger {
    rpc: Arc<RpcClient>,
    payer: Arc<Keypair>,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    pub fn new(rpc_url: impl Into<String>, commitment: CommitmentConfig, payer: Arc<Keypair>) -> Self {
        let rpc = RpcClient::new_with_commitment(rpc_url.into(), commitment);
        Self::with_client(Arc::new(rpc), commitment, payer)
    }

    pub fn with_client(rpc: Arc<RpcClient>, commitment: CommitmentConfig, payer: Arc<Keypair>) -> Self {
        Self { rpc, payer, commitment }
    }

    /// Sign with `signers` (the first one pays) and wait for confirmation
    pub async fn send_transaction(
        &self,
        instructions: &[Instruction],
        signers: &[&Keypair],
    ) -> AutoMarketResult<Signature> {
        let signers = unique_signers(signers);
        let fee_payer = signers
            .first()
            .ok_or_else(|| AutoMarketError::OrderSubmission("transaction has no signers".to_string()))?
            .pubkey();

        let recent_blockhash = self.rpc.get_latest_blockhash().await?;

        let tx = Transaction::new_signed_with_payer(
            instructions,
            Some(&fee_payer),
            signers.as_slice(),
            recent_blockhash,
        );

        Ok(self.rpc.send_and_confirm_transaction(&tx).await?)
    }

    /// Mint `amount` of `mint` into `account` with the payer as mint authority
    pub async fn mint_to(&self, account: &Pubkey, mint: &Pubkey, amount: u64) -> AutoMarketResult<Signature> {
        let ix = spl_token::instruction::mint_to(
            &spl_token::id(),
            mint,
            account,
            &self.payer.pubkey(),
            &[],
            amount,
        )?;

        self.send_transaction(&[ix], &[self.payer.as_ref()]).await
    }

    async fn account_exists(&self, address: &Pubkey) -> AutoMarketResult<bool> {
        let response = self
            .rpc
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.is_some())
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn submit_order(&self, order: &SwapOrder, signers: &[&Keypair]) -> AutoMarketResult<Signature> {
        let ix = order.to_instruction();
        self.send_transaction(&[ix], signers).await
    }

    async fn token_balance(&self, account: &Pubkey) -> AutoMarketResult<u64> {
        let balance = self.rpc.get_token_account_balance(account).await?;
        balance.amount.parse::<u64>().map_err(|e| {
            AutoMarketError::Parse(format!("Invalid token amount {} for {}: {}", balance.amount, account, e))
        })
    }
}

#[async_trait]
impl TokenProvisioner for RpcLedger {
    async fn ensure_account(&self, owner: &Pubkey, mint: &Pubkey) -> AutoMarketResult<Pubkey> {
        let address = get_associated_token_address(owner, mint);
        if self.account_exists(&address).await? {
            log::debug!("Token account {} for mint {} already exists", address, mint);
            return Ok(address);
        }

        let ix = create_associated_token_account_idempotent(
            &self.payer.pubkey(),
            owner,
            mint,
            &spl_token::id(),
        );
        let signature = self.send_transaction(&[ix], &[self.payer.as_ref()]).await?;
        log::info!("Created token account {} for mint {} ({})", address, mint, signature);

        Ok(address)
    }

    async fn ensure_minimum_balance(&self, account: &Pubkey, mint: &Pubkey, floor: u64) -> AutoMarketResult<u64> {
        let balance = self.token_balance(account).await?;
        if balance >= floor {
            return Ok(0);
        }

        let shortfall = floor - balance;
        let signature = self.mint_to(account, mint, shortfall).await?;
        log::debug!("Minted {} into {} ({})", shortfall, account, signature);

        Ok(shortfall)
    }
}

/// Drop repeated signers, keeping the first occurrence of each key
fn unique_signers<'a>(signers: &[&'a Keypair]) -> Vec<&'a Keypair> {
    let mut unique: Vec<&'a Keypair> = Vec::with_capacity(signers.len());
    for signer in signers {
        if !unique.iter().any(|seen| seen.pubkey() == signer.pubkey()) {
            unique.push(*signer);
        }
    }
    unique
}
