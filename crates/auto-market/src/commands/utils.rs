// Utility functions for CLI commands

use anyhow::{Context, Result};
use auto_market::identity::{expand_home, load_keypair_strict};
use auto_market::{ClusterConfig, PoolAddresses, RpcLedger};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use super::GlobalArgs;

/// Load the payer keypair, expanding `~`
pub fn load_payer(path: &str) -> Result<Arc<Keypair>> {
    let path = expand_home(path)?;
    let keypair = load_keypair_strict(&path).context("Failed to load payer keypair")?;
    Ok(Arc::new(keypair))
}

pub fn key_dir(global: &GlobalArgs) -> Result<PathBuf> {
    let dir = expand_home(&global.key_dir)?;
    if !dir.is_dir() {
        anyhow::bail!("Key directory {} does not exist", dir.display());
    }
    Ok(dir)
}

/// Resolve the pool from the key directory, honoring a program ID override
pub fn load_pool(global: &GlobalArgs) -> Result<PoolAddresses> {
    let dir = key_dir(global)?;
    let pool = PoolAddresses::load(&dir)
        .with_context(|| format!("Failed to load pool addresses from {}", dir.display()))?;

    match &global.swap_program_id {
        Some(id) => Ok(pool.with_swap_program_id(parse_pubkey(id)?)),
        None => Ok(pool),
    }
}

/// Connect to the cluster, preferring the `--url` override
pub fn connect(global: &GlobalArgs, cluster: &ClusterConfig, payer: Arc<Keypair>) -> Result<RpcLedger> {
    let url = global.url.clone().unwrap_or_else(|| cluster.rpc_url.clone());
    let commitment = cluster.commitment_config()?;
    info(&format!("RPC URL: {}", url));
    Ok(RpcLedger::new(url, commitment, payer))
}

/// Parse a pubkey from string
pub fn parse_pubkey(s: &str) -> Result<Pubkey> {
    Pubkey::from_str(s).context("Invalid public key")
}

/// Print success message
pub fn success(msg: &str) {
    println!("[OK] {}", msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("[INFO] {}", msg);
}

/// Print warning message
pub fn warn(msg: &str) {
    eprintln!("[WARN] {}", msg);
}
