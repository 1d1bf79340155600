//! File-backed data loader
//!
//! Reads a manager's backing data from a JSON, TOML or YAML file chosen by
//! extension. The document must be a table; its top-level entries become
//! the lookup keys.

use async_trait::async_trait;
use serde_json::Value;
use settings_core::{BackingData, DataLoader, LoadError};
use std::path::{Path, PathBuf};

/// Supported data file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Toml,
    Yaml,
}

impl DataFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parse `content` into backing data
    pub fn parse(self, content: &str) -> Result<BackingData, LoadError> {
        let document: Value = match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Toml => toml::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        };

        match document {
            Value::Object(entries) => Ok(entries.into_iter().collect()),
            Value::Null => Ok(BackingData::new()),
            other => Err(format!("expected a table of keys, found {}", kind_of(&other)).into()),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

/// Loader reading backing data from one file
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataLoader for FileLoader {
    async fn load(&self) -> Result<BackingData, LoadError> {
        let format = DataFormat::from_path(&self.path).ok_or_else(|| {
            format!(
                "unsupported data file '{}': expected .json, .toml, .yaml or .yml",
                self.path.display()
            )
        })?;

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| format!("cannot read '{}': {e}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), ?format, "Loaded data file");
        format.parse(&content)
    }
}
