//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Lazy Settings - resolve settings manifests against their data sources
#[derive(Parser, Debug)]
#[command(name = "lazy-settings")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve every setting and print the result
    ///
    /// Examples:
    ///   lazy-settings resolve settings.toml
    ///   lazy-settings resolve settings.toml --data simple=config.json
    ///   lazy-settings resolve settings.toml --data vault=secrets.yaml --json
    Resolve {
        #[command(flatten)]
        source: SourceArgs,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Check that every setting resolves, reporting per manager
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Manifest and backing-data files shared by all commands
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SourceArgs {
    /// Path to the settings manifest (TOML)
    pub manifest: PathBuf,

    /// Backing data for a manager, as KIND=PATH (JSON, TOML or YAML)
    #[arg(short, long = "data", value_name = "KIND=PATH", value_parser = parse_data_source)]
    pub data: Vec<DataSource>,
}

/// One `--data KIND=PATH` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    pub kind: String,
    pub path: PathBuf,
}

fn parse_data_source(arg: &str) -> Result<DataSource, String> {
    match arg.split_once('=') {
        Some((kind, path)) if !kind.is_empty() && !path.is_empty() => Ok(DataSource {
            kind: kind.to_string(),
            path: PathBuf::from(path),
        }),
        _ => Err(format!("expected KIND=PATH, got '{arg}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_resolve_with_data_sources() {
        let cli = Cli::parse_from([
            "lazy-settings",
            "resolve",
            "settings.toml",
            "--data",
            "simple=config.json",
            "-d",
            "vault=secrets.yaml",
            "--json",
        ]);

        match cli.command {
            Some(Commands::Resolve { source, json }) => {
                assert!(json);
                assert_eq!(source.manifest, PathBuf::from("settings.toml"));
                assert_eq!(source.data.len(), 2);
                assert_eq!(source.data[1].kind, "vault");
                assert_eq!(source.data[1].path, PathBuf::from("secrets.yaml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parse_verbose_is_global() {
        let cli = Cli::parse_from(["lazy-settings", "check", "settings.toml", "--verbose"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Check { .. })));
    }

    #[test]
    fn data_source_requires_kind_and_path() {
        assert!(parse_data_source("config.json").is_err());
        assert!(parse_data_source("=config.json").is_err());
        assert!(parse_data_source("simple=").is_err());
        assert_eq!(
            parse_data_source("simple=a=b.json").unwrap().path,
            PathBuf::from("a=b.json")
        );
    }
}
