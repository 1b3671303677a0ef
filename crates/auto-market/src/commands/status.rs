// Pool and agent balance report

use anyhow::Result;
use auto_market::identity::load_keypair_strict;
use auto_market::{ClusterConfig, KeyStore, LedgerClient, RpcLedger};
use clap::Args;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use spl_associated_token_account::get_associated_token_address;
use std::sync::Arc;

use super::{
    utils::{connect, info, key_dir, load_payer, load_pool, warn},
    GlobalArgs,
};

#[derive(Args)]
pub struct StatusCmd {
    /// Highest agent index to look for
    #[arg(long, default_value = "100")]
    max_agents: usize,
}

async fn balance_or_dash(ledger: &RpcLedger, account: &Pubkey) -> String {
    match ledger.token_balance(account).await {
        Ok(balance) => balance.to_string(),
        Err(e) => {
            log::debug!("No balance for {}: {}", account, e);
            "-".to_string()
        }
    }
}

pub async fn execute(cmd: StatusCmd, global: &GlobalArgs) -> Result<()> {
    // Read-only; any keypair will do when the payer is unavailable
    let payer = load_payer(&global.payer).unwrap_or_else(|e| {
        log::debug!("Using a throwaway keypair: {}", e);
        Arc::new(Keypair::new())
    });
    let pool = load_pool(global)?;
    let ledger = connect(global, &ClusterConfig::default(), payer)?;

    info(&format!("Pool: {}", pool.pool));
    println!("{:<10} {:>20} {:>20}", "vault", "A", "B");
    println!(
        "{:<10} {:>20} {:>20}",
        "pool",
        balance_or_dash(&ledger, &pool.vault_a).await,
        balance_or_dash(&ledger, &pool.vault_b).await
    );

    let store = KeyStore::new(key_dir(global)?);
    let agents = store.existing_agents(cmd.max_agents);
    if agents.is_empty() {
        warn(&format!("No agent keypairs in {}", store.dir().display()));
        return Ok(());
    }

    println!();
    println!("{:<10} {:<44} {:>20} {:>20}", "agent", "owner", "A", "B");
    for index in agents {
        let owner = match load_keypair_strict(&store.agent_path(index)) {
            Ok(keypair) => keypair.pubkey(),
            Err(e) => {
                warn(&format!("{}: {}", KeyStore::agent_name(index), e));
                continue;
            }
        };
        let token_a = get_associated_token_address(&owner, &pool.mint_a);
        let token_b = get_associated_token_address(&owner, &pool.mint_b);

        println!(
            "{:<10} {:<44} {:>20} {:>20}",
            KeyStore::agent_name(index),
            owner.to_string(),
            balance_or_dash(&ledger, &token_a).await,
            balance_or_dash(&ledger, &token_b).await
        );
    }

    Ok(())
}
