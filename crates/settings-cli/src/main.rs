//! Lazy Settings CLI
//!
//! Resolves a settings manifest against file-backed data sources and
//! reports the resolved values or the reason resolution did not converge.

mod cli;
mod commands;
mod error;
mod loader;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::{CliError, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose).map_err(|e| CliError::user(e.to_string()))?;
    if cli.verbose {
        tracing::debug!("Verbose mode enabled");
    }

    match cli.command {
        Some(Commands::Resolve { source, json }) => commands::run_resolve(&source, json).await,
        Some(Commands::Check { source }) => commands::run_check(&source).await,
        None => {
            println!("{} Lazy Settings CLI", "lazy-settings".green().bold());
            println!();
            println!(
                "Run {} for available commands.",
                "lazy-settings --help".cyan()
            );
            Ok(())
        }
    }
}
