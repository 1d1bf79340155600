//! Command implementations for settings-cli

pub mod check;
pub mod resolve;

pub use check::run_check;
pub use resolve::run_resolve;

use crate::cli::SourceArgs;
use crate::error::{CliError, Result};
use crate::loader::FileLoader;
use settings_core::{SettingsManifest, SettingsRegistry};
use std::collections::HashMap;

/// Read the manifest, attach a file loader per `--data` source and start
/// configuring every manager
async fn start_registry(source: &SourceArgs) -> Result<SettingsRegistry> {
    let content = tokio::fs::read_to_string(&source.manifest)
        .await
        .map_err(|e| {
            CliError::user(format!(
                "cannot read manifest '{}': {e}",
                source.manifest.display()
            ))
        })?;

    let name = source
        .manifest
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "settings".to_string());
    let module = SettingsManifest::parse(&content)?.into_module(name)?;

    let mut files = HashMap::new();
    for data in &source.data {
        if files.insert(data.kind.as_str(), &data.path).is_some() {
            return Err(CliError::user(format!(
                "data for manager '{}' given more than once",
                data.kind
            )));
        }
    }

    let specs = module.manager_specs();
    if let Some(unknown) = files
        .keys()
        .find(|kind| !specs.iter().any(|spec| spec.kind() == **kind))
    {
        return Err(CliError::user(format!(
            "manifest declares no manager '{unknown}'"
        )));
    }

    let specs = specs
        .into_iter()
        .map(|spec| match files.get(spec.kind()) {
            Some(path) => {
                let loader = FileLoader::new(*path);
                spec.with_loader(loader)
            }
            None => spec,
        })
        .collect();

    tracing::debug!(manifest = %source.manifest.display(), "Starting settings registry");
    Ok(SettingsRegistry::initialize(specs, module)?)
}
