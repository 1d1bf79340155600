//! Settings manifests
//!
//! A manifest declares settings in TOML instead of code. Each entry under
//! `[settings]` is either a descriptor (`key`, `ref`, `default`, `manager`)
//! or an explicit `value`:
//!
//! ```toml
//! managers = ["simple", "vault"]
//!
//! [settings.DATABASE_URL]
//! key = "db_url"
//!
//! [settings.REPLICA_URL]
//! ref = "DATABASE_URL"
//!
//! [settings.API_TOKEN]
//! key = "api_token"
//! manager = "vault"
//!
//! [settings.DEBUG]
//! value = false
//! ```

use crate::descriptor::{DEFAULT_KIND, SettingDescriptor};
use crate::manager::ManagerSpec;
use crate::module::{Declaration, SettingsModule, validate_setting_name};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// One `[settings.NAME]` table
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingEntry {
    /// Lookup key into the manager's backing data
    #[serde(default)]
    pub key: Option<String>,

    /// Name of another setting to copy
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,

    /// Literal default
    #[serde(default)]
    pub default: Option<Value>,

    /// Explicit value; excludes every other field
    #[serde(default)]
    pub value: Option<Value>,

    /// Descriptor kind, i.e. the owning manager
    #[serde(default)]
    pub manager: Option<String>,
}

impl SettingEntry {
    fn is_descriptor(&self) -> bool {
        self.key.is_some()
            || self.reference.is_some()
            || self.default.is_some()
            || self.manager.is_some()
    }

    fn into_declaration(self, name: &str) -> Result<Declaration> {
        let is_descriptor = self.is_descriptor();
        if let Some(value) = self.value {
            if is_descriptor {
                return Err(Error::InvalidManifest {
                    message: format!(
                        "setting '{name}' has an explicit value and cannot also declare key, ref, default or manager"
                    ),
                });
            }
            return Ok(Declaration::Value(value));
        }

        let mut descriptor =
            SettingDescriptor::new().kind(self.manager.as_deref().unwrap_or(DEFAULT_KIND));
        if let Some(key) = self.key {
            descriptor = descriptor.key(key);
        }
        if let Some(reference) = self.reference {
            descriptor = descriptor.reference(reference);
        }
        if let Some(default) = self.default {
            descriptor = descriptor.default_value(default);
        }
        Ok(Declaration::Lazy(descriptor))
    }
}

/// Parsed settings manifest
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsManifest {
    /// Manager kinds in resolution order; defaults to the simple manager
    #[serde(default)]
    pub managers: Option<Vec<String>>,

    /// Declared settings keyed by name
    #[serde(default)]
    pub settings: BTreeMap<String, SettingEntry>,
}

impl SettingsManifest {
    /// Parse a manifest from TOML content
    ///
    /// # Example
    ///
    /// ```
    /// use settings_core::SettingsManifest;
    ///
    /// let manifest = SettingsManifest::parse(r#"
    /// [settings.TIMEOUT]
    /// default = 30
    /// "#).unwrap();
    ///
    /// assert_eq!(manifest.manager_kinds(), vec!["simple"]);
    /// assert_eq!(manifest.settings.len(), 1);
    /// ```
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::InvalidManifest {
            message: e.to_string(),
        })
    }

    /// Manager kinds, falling back to the single default manager
    pub fn manager_kinds(&self) -> Vec<String> {
        self.managers
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_KIND.to_string()])
    }

    /// Convert into a settings module named `name`
    ///
    /// Managers are created with no loader; callers install loaders on
    /// the returned [`ManagerSpec`]s before initializing a registry.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSettingName`] for names that are not upper-case
    /// - [`Error::InvalidManifest`] for conflicting fields or repeated managers
    pub fn into_module(self, name: impl Into<String>) -> Result<SettingsModule> {
        let kinds = self.manager_kinds();
        let mut unique = HashSet::new();
        if let Some(repeated) = kinds.iter().find(|kind| !unique.insert(kind.as_str())) {
            return Err(Error::InvalidManifest {
                message: format!("manager '{repeated}' is listed more than once"),
            });
        }

        let mut module = SettingsModule::new(name)
            .with_managers(kinds.iter().map(ManagerSpec::new).collect());

        for (setting, entry) in self.settings {
            validate_setting_name(&setting)?;
            let declaration = entry.into_declaration(&setting)?;
            module = module.declare(setting, declaration);
        }

        Ok(module)
    }
}
