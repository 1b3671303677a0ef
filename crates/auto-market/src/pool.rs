//! Pool address bundle, resolved once at startup and shared read-only

use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use std::path::Path;

use crate::direction::Asset;
use crate::error::AutoMarketResult;
use crate::identity::{load_keypair_strict, read_address_file};

/// SPL token-swap program
pub const TOKEN_SWAP_PROGRAM_ID: Pubkey = pubkey!("SwapsVeCiPHMUAtzQWZw7RjsKjgCjhwU55QGu4U1Szw");

/// File names written by the pool setup scripts
pub mod files {
    pub const SWAP_ACCOUNT: &str = "swap_account.json";
    pub const MINT_A: &str = "mint_a.txt";
    pub const MINT_B: &str = "mint_b.txt";
    pub const AUTHORITY: &str = "authority_pda.txt";
    pub const VAULT_A: &str = "vault_a.txt";
    pub const VAULT_B: &str = "vault_b.txt";
    pub const LP_MINT: &str = "mint_lp.txt";
    pub const FEE_ACCOUNT: &str = "vault_fee.txt";
}

/// Addresses of the pool every agent trades against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool: Pubkey,
    /// Derived signing delegate of the pool (no private key)
    pub authority: Pubkey,
    pub vault_a: Pubkey,
    pub vault_b: Pubkey,
    pub lp_mint: Pubkey,
    pub fee_account: Pubkey,
    pub mint_a: Pubkey,
    pub mint_b: Pubkey,
    pub swap_program_id: Pubkey,
    pub token_program_id: Pubkey,
}

impl PoolAddresses {
    /// Resolve the pool from the files the setup scripts leave in `key_dir`.
    ///
    /// The pool account itself is stored as a keypair; only its public key is kept.
    pub fn load(key_dir: &Path) -> AutoMarketResult<Self> {
        let pool = load_keypair_strict(&key_dir.join(files::SWAP_ACCOUNT))?.pubkey();

        Ok(Self {
            pool,
            authority: read_address_file(&key_dir.join(files::AUTHORITY))?,
            vault_a: read_address_file(&key_dir.join(files::VAULT_A))?,
            vault_b: read_address_file(&key_dir.join(files::VAULT_B))?,
            lp_mint: read_address_file(&key_dir.join(files::LP_MINT))?,
            fee_account: read_address_file(&key_dir.join(files::FEE_ACCOUNT))?,
            mint_a: read_address_file(&key_dir.join(files::MINT_A))?,
            mint_b: read_address_file(&key_dir.join(files::MINT_B))?,
            swap_program_id: TOKEN_SWAP_PROGRAM_ID,
            token_program_id: spl_token::id(),
        })
    }

    pub fn with_swap_program_id(mut self, program_id: Pubkey) -> Self {
        self.swap_program_id = program_id;
        self
    }

    pub fn vault(&self, asset: Asset) -> Pubkey {
        match asset {
            Asset::A => self.vault_a,
            Asset::B => self.vault_b,
        }
    }

    pub fn mint(&self, asset: Asset) -> Pubkey {
        match asset {
            Asset::A => self.mint_a,
            Asset::B => self.mint_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::write_address_file;
    use solana_sdk::signature::{write_keypair_file, Keypair};
    use tempfile::TempDir;

    fn write_pool_dir(dir: &Path) -> (Keypair, Vec<(&'static str, Pubkey)>) {
        let swap_account = Keypair::new();
        write_keypair_file(&swap_account, dir.join(files::SWAP_ACCOUNT)).unwrap();

        let entries = vec![
            (files::MINT_A, Pubkey::new_unique()),
            (files::MINT_B, Pubkey::new_unique()),
            (files::AUTHORITY, Pubkey::new_unique()),
            (files::VAULT_A, Pubkey::new_unique()),
            (files::VAULT_B, Pubkey::new_unique()),
            (files::LP_MINT, Pubkey::new_unique()),
            (files::FEE_ACCOUNT, Pubkey::new_unique()),
        ];
        for (name, key) in &entries {
            write_address_file(&dir.join(name), key).unwrap();
        }
        (swap_account, entries)
    }

    #[test]
    fn test_load_from_key_dir() {
        let dir = TempDir::new().unwrap();
        let (swap_account, entries) = write_pool_dir(dir.path());
        let lookup = |name: &str| entries.iter().find(|(n, _)| *n == name).unwrap().1;

        let pool = PoolAddresses::load(dir.path()).unwrap();
        assert_eq!(pool.pool, swap_account.pubkey());
        assert_eq!(pool.mint_a, lookup(files::MINT_A));
        assert_eq!(pool.vault_b, lookup(files::VAULT_B));
        assert_eq!(pool.fee_account, lookup(files::FEE_ACCOUNT));
        assert_eq!(pool.swap_program_id, TOKEN_SWAP_PROGRAM_ID);
        assert_eq!(pool.vault(Asset::A), pool.vault_a);
        assert_eq!(pool.mint(Asset::B), pool.mint_b);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        write_pool_dir(dir.path());
        std::fs::remove_file(dir.path().join(files::VAULT_A)).unwrap();

        assert!(PoolAddresses::load(dir.path()).is_err());
    }
}
