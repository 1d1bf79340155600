//! Check command implementation

use colored::Colorize;

use super::start_registry;
use crate::cli::SourceArgs;
use crate::error::{CliError, Result};

/// Run the check command
///
/// Waits on every manager separately so each one's outcome is reported,
/// then fails if any of them did not converge.
pub async fn run_check(source: &SourceArgs) -> Result<()> {
    let registry = start_registry(source).await?;

    println!(
        "{} {}",
        "Checking".bold(),
        source.manifest.display()
    );

    let mut failed = 0;
    for manager in registry.managers() {
        let count = manager.setting_names().len();
        match manager.wait().await {
            Ok(()) => println!(
                "  {} {} ({} settings)",
                "ok".green(),
                manager.kind().cyan(),
                count
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "failed".red(), manager.kind().cyan(), e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::user(format!(
            "{failed} of {} managers failed to configure",
            registry.managers().len()
        )));
    }

    println!();
    println!(
        "{} {} settings resolved",
        "OK".green().bold(),
        registry.settings().len()
    );
    Ok(())
}
