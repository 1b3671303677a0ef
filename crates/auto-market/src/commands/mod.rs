// Command modules for the auto-market CLI

pub mod run;
pub mod status;
pub mod swap;
pub mod utils;

use anyhow::{Context, Result};
use auto_market::create_example_config;
use std::path::Path;

/// Options shared by every subcommand
pub struct GlobalArgs {
    pub url: Option<String>,
    pub payer: String,
    pub key_dir: String,
    pub swap_program_id: Option<String>,
}

pub fn init_config(path: &str) -> Result<()> {
    let path = Path::new(path);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    create_example_config(path).context("Failed to write example config")?;
    utils::success(&format!("Example configuration written to {}", path.display()));
    Ok(())
}
