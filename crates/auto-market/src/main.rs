// CLI for the auto-market volume generator
//
// Drives a population of trading agents against an SPL token-swap pool whose
// addresses were written to a key directory by the pool setup scripts.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "auto-market")]
#[command(about = "Synthetic volume generator for an SPL token-swap pool", long_about = None)]
#[command(version)]
struct Cli {
    /// RPC URL to connect to (overrides the config file)
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Fee payer keypair; also the mint authority of both pool mints
    #[arg(short, long, global = true, default_value = "~/.config/solana/id.json")]
    payer: String,

    /// Directory with the pool address files and agent keypairs
    #[arg(short, long, global = true, default_value = "keys")]
    key_dir: String,

    /// Token-swap program ID (defaults to the SPL deployment)
    #[arg(long, global = true)]
    swap_program_id: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision agents and trade until Ctrl+C
    Run(commands::run::RunCmd),

    /// Submit a single swap from the payer's own token accounts
    Swap(commands::swap::SwapCmd),

    /// Show pool vault and agent balances
    Status(commands::status::StatusCmd),

    /// Write an example configuration file
    InitConfig {
        /// Output path
        #[arg(default_value = "auto-market.toml")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if cli.verbose { "debug" } else { "info" }),
    )
    .init();

    let global = commands::GlobalArgs {
        url: cli.url,
        payer: cli.payer,
        key_dir: cli.key_dir,
        swap_program_id: cli.swap_program_id,
    };

    match cli.command {
        Commands::Run(cmd) => commands::run::execute(cmd, &global).await,
        Commands::Swap(cmd) => commands::swap::execute(cmd, &global).await,
        Commands::Status(cmd) => commands::status::execute(cmd, &global).await,
        Commands::InitConfig { path } => commands::init_config(&path),
    }
}
