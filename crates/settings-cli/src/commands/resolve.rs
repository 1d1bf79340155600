//! Resolve command implementation

use colored::Colorize;

use super::start_registry;
use crate::cli::SourceArgs;
use crate::error::Result;

/// Run the resolve command
pub async fn run_resolve(source: &SourceArgs, json: bool) -> Result<()> {
    let registry = start_registry(source).await?;
    registry.wait().await?;

    let settings = registry.settings();
    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    if settings.is_empty() {
        println!("{}", "No settings declared".dimmed());
        return Ok(());
    }

    for (name, value) in &settings {
        if registry.is_overridden(name) {
            println!("{} = {} {}", name.cyan(), value, "(explicit)".dimmed());
        } else {
            println!("{} = {}", name.cyan(), value);
        }
    }

    Ok(())
}
