//! Keypair and address files
//!
//! Keypairs are stored in the Solana CLI JSON format (an array of 64 bytes).
//! Addresses are stored as a single base58 string per file.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, write_keypair_file, Keypair, Signer};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AutoMarketError, AutoMarketResult};

/// Load a keypair, generating and saving a new one if the file does not exist
pub fn load_or_create_keypair(path: &Path) -> AutoMarketResult<Keypair> {
    if !path.exists() {
        let keypair = Keypair::new();
        write_keypair_file(&keypair, path).map_err(|e| {
            AutoMarketError::Io(format!("Failed to write keypair to {}: {}", path.display(), e))
        })?;
        log::info!("Generated new keypair {} at {}", keypair.pubkey(), path.display());
        return Ok(keypair);
    }

    load_keypair_strict(path)
}

/// Load a keypair, failing if the file does not exist
pub fn load_keypair_strict(path: &Path) -> AutoMarketResult<Keypair> {
    if !path.exists() {
        return Err(AutoMarketError::Io(format!(
            "Keypair file does not exist: {}",
            path.display()
        )));
    }

    let keypair = read_keypair_file(path).map_err(|e| {
        AutoMarketError::Parse(format!("Failed to load keypair from {}: {}", path.display(), e))
    })?;
    log::debug!("Loaded keypair {} from {}", keypair.pubkey(), path.display());
    Ok(keypair)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> AutoMarketResult<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let home = std::env::var("HOME")
                .map_err(|_| AutoMarketError::config("HOME environment variable not set"))?;
            Ok(PathBuf::from(format!("{}{}", home, rest)))
        }
        None => Ok(PathBuf::from(path)),
    }
}

/// Read a base58 address stored as the only content of a file
pub fn read_address_file(path: &Path) -> AutoMarketResult<Pubkey> {
    let content = fs::read_to_string(path)
        .map_err(|e| AutoMarketError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    Pubkey::from_str(content.trim()).map_err(|e| {
        AutoMarketError::Parse(format!("Invalid address in {}: {}", path.display(), e))
    })
}

/// Write an address file, the inverse of [`read_address_file`]
pub fn write_address_file(path: &Path, address: &Pubkey) -> AutoMarketResult<()> {
    fs::write(path, address.to_string())?;
    Ok(())
}

/// Per-agent keypair files inside a key directory
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Display name of agent `index`, also the stem of its keypair file
    pub fn agent_name(index: usize) -> String {
        format!("agent_{:03}", index)
    }

    pub fn agent_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.json", Self::agent_name(index)))
    }

    pub fn load_or_create_agent(&self, index: usize) -> AutoMarketResult<Keypair> {
        load_or_create_keypair(&self.agent_path(index))
    }

    /// Indices of agents whose keypair files already exist, in order
    pub fn existing_agents(&self, limit: usize) -> Vec<usize> {
        (0..limit).filter(|i| self.agent_path(*i).exists()).collect()
    }
}
