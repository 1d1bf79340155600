//! Settings registry
//!
//! The registry owns every manager of one settings module. It classifies
//! declarations, starts all managers configuring concurrently, and lets
//! consumers wait until every manager has converged.

use crate::manager::{ManagerSpec, SourceManager};
use crate::module::{Declaration, SettingsModule, is_setting_name};
use crate::store::SettingsStore;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinSet;

/// Coordinator for all managers of one settings module
///
/// # Example
///
/// ```
/// use settings_core::{ManagerSpec, SettingDescriptor, SettingsModule, SettingsRegistry};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> settings_core::Result<()> {
/// let module = SettingsModule::new("app.settings")
///     .declare("TIMEOUT", SettingDescriptor::new().default_value(30))
///     .declare("RETRY_TIMEOUT", SettingDescriptor::new().reference("TIMEOUT"))
///     .declare("DEBUG", json!(true));
///
/// let registry = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module)?;
/// registry.wait().await?;
///
/// assert_eq!(registry.get("RETRY_TIMEOUT")?, json!(30));
/// assert!(registry.is_overridden("DEBUG"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SettingsRegistry {
    module: String,
    store: Arc<SettingsStore>,
    managers: Vec<Arc<SourceManager>>,
    explicit: HashSet<String>,
}

impl SettingsRegistry {
    /// Build managers from `specs`, register the module's declarations and
    /// start configuring every manager in the background
    ///
    /// Returns as soon as configuration has been started; use
    /// [`wait`](Self::wait) to observe completion. Descriptors go to the
    /// first manager that accepts their kind. Identifiers that are not
    /// upper-case are not settings and are skipped.
    ///
    /// # Errors
    ///
    /// Configuration errors only: [`Error::NoRuntime`],
    /// [`Error::DuplicateManager`], [`Error::DuplicateSetting`],
    /// [`Error::UnmanagedDescriptor`].
    pub fn initialize(specs: Vec<ManagerSpec>, module: SettingsModule) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;

        // Progress is tracked per kind, so kinds must be unique.
        let mut kinds = HashSet::new();
        if let Some(repeated) = specs.iter().find(|spec| !kinds.insert(spec.kind())) {
            return Err(Error::DuplicateManager {
                kind: repeated.kind().to_string(),
            });
        }

        let store = Arc::new(SettingsStore::new());
        let mut managers: Vec<SourceManager> = specs
            .iter()
            .map(|spec| spec.build(Arc::clone(&store)))
            .collect();

        let (module_name, declarations) = module.into_parts();
        let mut seen = HashSet::new();
        let mut explicit = HashSet::new();

        for (name, declaration) in declarations {
            if !is_setting_name(&name) {
                tracing::trace!(module = %module_name, %name, "Skipping non-setting identifier");
                continue;
            }
            if !seen.insert(name.clone()) {
                return Err(Error::DuplicateSetting {
                    manager: module_name,
                    name,
                });
            }

            match declaration {
                Declaration::Lazy(descriptor) => {
                    let Some(manager) = managers.iter_mut().find(|m| m.accepts(&descriptor))
                    else {
                        return Err(Error::UnmanagedDescriptor {
                            name,
                            kind: descriptor.descriptor_kind().to_string(),
                        });
                    };
                    manager.add_setting(&name, descriptor)?;
                }
                Declaration::Value(value) => {
                    store.set_explicit(&name, value);
                    explicit.insert(name);
                }
            }
        }

        let managers: Vec<Arc<SourceManager>> = managers.into_iter().map(Arc::new).collect();
        for manager in &managers {
            manager.schedule();
        }

        tracing::debug!(
            module = %module_name,
            managers = managers.len(),
            explicit = explicit.len(),
            "Starting settings configuration"
        );
        runtime.spawn(configure_all(managers.clone()));

        Ok(Self {
            module: module_name,
            store,
            managers,
            explicit,
        })
    }

    /// Initialize with the managers declared by the module itself
    pub fn from_module(module: SettingsModule) -> Result<Self> {
        let specs = module.manager_specs();
        Self::initialize(specs, module)
    }

    /// Wait until every manager has resolved all of its settings
    ///
    /// Safe to call any number of times, from any number of tasks.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first manager (in declaration order)
    /// whose configuration failed.
    pub async fn wait(&self) -> Result<()> {
        for manager in &self.managers {
            manager.wait().await?;
        }
        Ok(())
    }

    /// Whether `name` was given an explicit value rather than a descriptor
    pub fn is_overridden(&self, name: &str) -> bool {
        self.explicit.contains(name)
    }

    /// Read a setting; see [`SettingsStore::get`]
    pub fn get(&self, name: &str) -> Result<Value> {
        self.store.get(name)
    }

    /// Read a setting as `T`; see [`SettingsStore::get_as`]
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.store.get_as(name)
    }

    /// All resolved settings, sorted by name
    pub fn settings(&self) -> BTreeMap<String, Value> {
        self.store.resolved()
    }

    /// Whether every manager is configured
    pub fn configured(&self) -> bool {
        self.managers.iter().all(|manager| manager.configured())
    }

    /// Manager owning descriptors of `kind`
    pub fn manager(&self, kind: &str) -> Option<&Arc<SourceManager>> {
        self.managers.iter().find(|manager| manager.kind() == kind)
    }

    pub fn managers(&self) -> &[Arc<SourceManager>] {
        &self.managers
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }
}

/// Configure all managers concurrently; outcomes are observed via `wait`
async fn configure_all(managers: Vec<Arc<SourceManager>>) {
    let mut tasks = JoinSet::new();
    for manager in managers {
        tasks.spawn(async move { manager.configure().await });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "Settings configuration task did not complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SettingDescriptor;
    use serde_json::json;

    #[test]
    fn initialize_outside_runtime_fails() {
        let err = SettingsRegistry::initialize(vec![ManagerSpec::simple()], SettingsModule::new("app"))
            .unwrap_err();
        assert_eq!(err, Error::NoRuntime);
    }

    #[tokio::test]
    async fn explicit_values_are_overridden_and_readable() {
        let module = SettingsModule::new("app")
            .declare("DEBUG", json!(true))
            .declare("TIMEOUT", SettingDescriptor::new().default_value(30));

        let registry = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module).unwrap();

        assert!(registry.is_overridden("DEBUG"));
        assert!(!registry.is_overridden("TIMEOUT"));
        assert_eq!(registry.get("DEBUG").unwrap(), json!(true));

        registry.wait().await.unwrap();
        assert!(registry.configured());
        assert_eq!(registry.get_as::<u32>("TIMEOUT").unwrap(), 30);
    }

    #[tokio::test]
    async fn reads_before_wait_are_not_configured() {
        let module = SettingsModule::new("app")
            .declare("TIMEOUT", SettingDescriptor::new().default_value(30));

        let registry = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module).unwrap();

        // The configuration task has not been polled yet on this runtime.
        assert_eq!(
            registry.get("TIMEOUT"),
            Err(Error::NotConfigured {
                name: "TIMEOUT".to_string()
            })
        );
        registry.wait().await.unwrap();
        assert_eq!(registry.get("TIMEOUT").unwrap(), json!(30));
    }

    #[tokio::test]
    async fn lower_case_identifiers_are_ignored() {
        let module = SettingsModule::new("app")
            .declare("helper", json!("not a setting"))
            .declare("NAME", json!("svc"));

        let registry = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module).unwrap();

        assert!(matches!(
            registry.get("helper"),
            Err(Error::UnknownSetting { .. })
        ));
        assert!(!registry.is_overridden("helper"));
        assert_eq!(registry.settings().len(), 1);
    }

    #[tokio::test]
    async fn descriptors_go_to_manager_of_their_kind() {
        let module = SettingsModule::new("app")
            .declare("SECRET", SettingDescriptor::new().kind("vault").default_value("s3cr3t"))
            .declare("PLAIN", SettingDescriptor::new().default_value(1));

        let registry = SettingsRegistry::initialize(
            vec![ManagerSpec::simple(), ManagerSpec::new("vault")],
            module,
        )
        .unwrap();

        let managers = registry.managers();
        assert_eq!(managers[0].setting_names(), vec!["PLAIN"]);
        assert_eq!(managers[1].setting_names(), vec!["SECRET"]);
        assert_eq!(registry.manager("vault").unwrap().kind(), "vault");

        registry.wait().await.unwrap();
        assert_eq!(registry.get("SECRET").unwrap(), json!("s3cr3t"));
    }

    #[tokio::test]
    async fn repeated_manager_kind_is_rejected() {
        let module = SettingsModule::new("app")
            .declare("A", SettingDescriptor::new().kind("vault").key("x"))
            .declare("B", SettingDescriptor::new().reference("A"));

        let err = SettingsRegistry::initialize(
            vec![ManagerSpec::simple(), ManagerSpec::new("vault"), ManagerSpec::new("vault")],
            module,
        )
        .unwrap_err();

        assert_eq!(
            err,
            Error::DuplicateManager {
                kind: "vault".to_string()
            }
        );
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn unmanaged_descriptor_is_rejected() {
        let module = SettingsModule::new("app")
            .declare("SECRET", SettingDescriptor::new().kind("vault"));

        let err = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module).unwrap_err();
        assert_eq!(
            err,
            Error::UnmanagedDescriptor {
                name: "SECRET".to_string(),
                kind: "vault".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn duplicate_declaration_is_rejected() {
        let module = SettingsModule::new("app")
            .declare("A", json!(1))
            .declare("A", SettingDescriptor::new().default_value(2));

        let err = SettingsRegistry::initialize(vec![ManagerSpec::simple()], module).unwrap_err();
        assert!(matches!(err, Error::DuplicateSetting { ref name, .. } if name == "A"));
    }

    #[tokio::test]
    async fn wait_reports_failed_manager() {
        let module = SettingsModule::new("app")
            .declare("F", SettingDescriptor::new().key("absent_key"));

        let registry = SettingsRegistry::from_module(module).unwrap();
        let err = registry.wait().await.unwrap_err();

        assert!(
            matches!(err, Error::Unresolved { ref missing_keys, .. } if missing_keys == &["F"])
        );
        assert!(!registry.configured());
    }
}
