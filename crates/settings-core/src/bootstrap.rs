//! Process bootstrap
//!
//! Settings are initialized explicitly, once per process, from the module
//! named by the `LAZY_SETTINGS_MODULE` environment variable. The resulting
//! registry is handed to consumers by reference; there is no implicit
//! global that initializes itself on first access.

use crate::module::SettingsModule;
use crate::registry::SettingsRegistry;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Environment variable naming the settings module to load
pub const SETTINGS_MODULE_ENV: &str = "LAZY_SETTINGS_MODULE";

type ModuleFactory = Arc<dyn Fn() -> SettingsModule + Send + Sync>;

/// Settings modules that can be selected at bootstrap, by name
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    modules: HashMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module factory under `name`, replacing any previous one
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> SettingsModule + Send + Sync + 'static,
    {
        self.modules.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Registered module names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn load(&self, name: &str) -> Result<SettingsModule> {
        self.modules
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownModule {
                name: name.to_string(),
            })
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCatalog")
            .field("modules", &self.names())
            .finish()
    }
}

/// Guard allowing one successful initialization
#[derive(Debug)]
pub struct Bootstrap {
    initialized: AtomicBool,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
        }
    }

    /// Initialize from an already-read bootstrap value
    ///
    /// `module` is the value of [`SETTINGS_MODULE_ENV`], if set. A failed
    /// attempt does not count as the one initialization.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyInitialized`] on a second successful call
    /// - [`Error::MissingBootstrap`] if `module` is absent or blank
    /// - [`Error::UnknownModule`] if the catalog has no such module
    /// - any error from [`SettingsRegistry::from_module`]
    pub fn init_from(
        &self,
        module: Option<&str>,
        catalog: &ModuleCatalog,
    ) -> Result<Arc<SettingsRegistry>> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        let result = Self::build(module, catalog);
        if result.is_err() {
            self.initialized.store(false, Ordering::SeqCst);
        }
        result
    }

    fn build(module: Option<&str>, catalog: &ModuleCatalog) -> Result<Arc<SettingsRegistry>> {
        let name = module
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::MissingBootstrap {
                var: SETTINGS_MODULE_ENV.to_string(),
            })?;

        tracing::debug!(module = %name, "Bootstrapping settings");
        let module = catalog.load(name)?;
        Ok(Arc::new(SettingsRegistry::from_module(module)?))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

static PROCESS: Bootstrap = Bootstrap::new();

/// Initialize the process settings from [`SETTINGS_MODULE_ENV`]
///
/// Must be called once, from within a tokio runtime, at process start.
pub fn init_from_env(catalog: &ModuleCatalog) -> Result<Arc<SettingsRegistry>> {
    let module = std::env::var(SETTINGS_MODULE_ENV).ok();
    PROCESS.init_from(module.as_deref(), catalog)
}

/// Initialize the process settings from an explicit module name
pub fn init(module: &str, catalog: &ModuleCatalog) -> Result<Arc<SettingsRegistry>> {
    PROCESS.init_from(Some(module), catalog)
}
