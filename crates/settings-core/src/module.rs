//! Settings modules
//!
//! A [`SettingsModule`] is what module discovery hands to the registry: an
//! ordered list of identifiers and their declared values, plus an optional
//! list of managers. Only upper-case identifiers are settings; anything else
//! in a module is ignored by the registry.

use crate::descriptor::SettingDescriptor;
use crate::manager::ManagerSpec;
use crate::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static SETTING_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_*[A-Z][A-Z0-9_]*$").expect("setting name pattern is valid"));

/// Whether `name` is an upper-case identifier, i.e. a setting name
pub fn is_setting_name(name: &str) -> bool {
    SETTING_NAME.is_match(name)
}

/// Reject names that are not upper-case identifiers
pub fn validate_setting_name(name: &str) -> Result<()> {
    if is_setting_name(name) {
        Ok(())
    } else {
        Err(Error::InvalidSettingName {
            name: name.to_string(),
            reason: "expected an upper-case identifier such as DATABASE_URL".to_string(),
        })
    }
}

/// Value declared for one identifier
#[derive(Debug, Clone)]
pub enum Declaration {
    /// Resolved later by the manager that accepts the descriptor
    Lazy(SettingDescriptor),
    /// Explicit concrete value
    Value(Value),
}

impl From<SettingDescriptor> for Declaration {
    fn from(descriptor: SettingDescriptor) -> Self {
        Self::Lazy(descriptor)
    }
}

impl From<Value> for Declaration {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Declarations discovered in one settings module
///
/// # Example
///
/// ```
/// use settings_core::{SettingDescriptor, SettingsModule};
/// use serde_json::json;
///
/// let module = SettingsModule::new("app.settings")
///     .declare("DATABASE_URL", SettingDescriptor::new().key("db_url"))
///     .declare("DEBUG", json!(false));
///
/// assert_eq!(module.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsModule {
    name: String,
    declarations: Vec<(String, Declaration)>,
    managers: Option<Vec<ManagerSpec>>,
}

impl SettingsModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            managers: None,
        }
    }

    /// Add a declaration; order is preserved
    pub fn declare(mut self, name: impl Into<String>, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push((name.into(), declaration.into()));
        self
    }

    /// Managers this module wants instead of the default one
    pub fn with_managers(mut self, managers: Vec<ManagerSpec>) -> Self {
        self.managers = Some(managers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declarations(&self) -> &[(String, Declaration)] {
        &self.declarations
    }

    /// Manager list declared by the module, or the single default manager
    pub fn manager_specs(&self) -> Vec<ManagerSpec> {
        self.managers
            .clone()
            .unwrap_or_else(|| vec![ManagerSpec::simple()])
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<(String, Declaration)>) {
        (self.name, self.declarations)
    }
}
