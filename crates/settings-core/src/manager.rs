//! Source managers
//!
//! A [`SourceManager`] owns one backing-data source and the descriptors
//! that resolve against it. Configuring a manager loads the data once,
//! freezes it, and runs the resolution engine over every registered
//! descriptor. Consumers observe completion through [`SourceManager::wait`].

use crate::data::{BackingData, DataView};
use crate::descriptor::{DEFAULT_KIND, SettingDescriptor};
use crate::engine::{self, Resolution};
use crate::module::validate_setting_name;
use crate::store::{Phase, SettingsStore};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, watch};

/// Error type loaders may return
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Asynchronous source of a manager's backing data
///
/// Only asynchronous loaders can be expressed, so a blocking loader is
/// rejected at compile time rather than at load time.
#[async_trait]
pub trait DataLoader: Send + Sync {
    async fn load(&self) -> std::result::Result<BackingData, LoadError>;
}

/// Loader used when none is installed; produces no data
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLoader;

#[async_trait]
impl DataLoader for EmptyLoader {
    async fn load(&self) -> std::result::Result<BackingData, LoadError> {
        Ok(BackingData::new())
    }
}

/// Adapter turning a zero-argument async function into a [`DataLoader`]
pub struct FnLoader<F> {
    func: F,
}

/// Wrap a zero-argument async function as a loader
///
/// # Example
///
/// ```
/// use settings_core::{BackingData, LoadError, ManagerSpec, loader_fn};
/// use serde_json::json;
///
/// let spec = ManagerSpec::simple().with_loader(loader_fn(|| async {
///     let mut data = BackingData::new();
///     data.insert("data".to_string(), json!(123));
///     Ok::<_, LoadError>(data)
/// }));
/// assert_eq!(spec.kind(), "simple");
/// ```
pub fn loader_fn<F, Fut>(func: F) -> FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<BackingData, LoadError>> + Send + 'static,
{
    FnLoader { func }
}

#[async_trait]
impl<F, Fut> DataLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<BackingData, LoadError>> + Send + 'static,
{
    async fn load(&self) -> std::result::Result<BackingData, LoadError> {
        (self.func)().await
    }
}

/// Recipe for one manager: the descriptor kind it owns and its loader
#[derive(Clone)]
pub struct ManagerSpec {
    kind: String,
    loader: Arc<dyn DataLoader>,
}

impl ManagerSpec {
    /// Spec for a manager owning descriptors of `kind`, with no data
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            loader: Arc::new(EmptyLoader),
        }
    }

    /// Spec for the default manager
    pub fn simple() -> Self {
        Self::new(DEFAULT_KIND)
    }

    /// Install the loader for this manager, replacing any previous one
    pub fn with_loader<L: DataLoader + 'static>(mut self, loader: L) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Instantiate a manager attached to `store`
    pub fn build(&self, store: Arc<SettingsStore>) -> SourceManager {
        let mut manager = SourceManager::new(self.kind.clone(), store);
        manager.loader = Arc::clone(&self.loader);
        manager
    }
}

impl fmt::Debug for ManagerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerSpec")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Readiness of a manager as observed by waiters
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Not configured yet, or a retry is in progress
    Pending,
    /// Every descriptor is resolved; final
    Ready,
    /// The last configuration attempt failed
    Failed(Error),
}

impl Readiness {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Owner of one backing-data source and its descriptors
pub struct SourceManager {
    kind: String,
    store: Arc<SettingsStore>,
    loader: Arc<dyn DataLoader>,
    settings: BTreeMap<String, SettingDescriptor>,
    /// Set once by the first successful load
    data: OnceLock<DataView>,
    configured: AtomicBool,
    started: AtomicBool,
    configure_lock: Mutex<()>,
    readiness: watch::Sender<Readiness>,
}

impl SourceManager {
    /// Create a manager with no loader, attached to `store`
    pub fn new(kind: impl Into<String>, store: Arc<SettingsStore>) -> Self {
        let kind = kind.into();
        store.attach(&kind);
        let (readiness, _) = watch::channel(Readiness::Pending);
        Self {
            kind,
            store,
            loader: Arc::new(EmptyLoader),
            settings: BTreeMap::new(),
            data: OnceLock::new(),
            configured: AtomicBool::new(false),
            started: AtomicBool::new(false),
            configure_lock: Mutex::new(()),
            readiness,
        }
    }

    /// Descriptor kind this manager owns
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn store(&self) -> &Arc<SettingsStore> {
        &self.store
    }

    /// Whether `descriptor` belongs to this manager
    pub fn accepts(&self, descriptor: &SettingDescriptor) -> bool {
        descriptor.descriptor_kind() == self.kind
    }

    /// Register a descriptor under `name`
    ///
    /// Binds the name into the descriptor and installs a placeholder in
    /// the store, so reads before resolution fail with
    /// [`Error::NotConfigured`].
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidSettingName`] if `name` is not an upper-case identifier
    /// - [`Error::DuplicateSetting`] if `name` is already registered here
    pub fn add_setting(&mut self, name: &str, descriptor: SettingDescriptor) -> Result<()> {
        validate_setting_name(name)?;
        if self.settings.contains_key(name) {
            return Err(Error::DuplicateSetting {
                manager: self.kind.clone(),
                name: name.to_string(),
            });
        }

        self.store.declare(name, &self.kind);
        self.settings
            .insert(name.to_string(), descriptor.bind(name));
        Ok(())
    }

    /// Replace the backing-data loader; the last installed loader wins
    ///
    /// # Errors
    ///
    /// Returns [`Error::LoaderAfterConfigure`] once configuration started.
    pub fn set_loader<L: DataLoader + 'static>(&mut self, loader: L) -> Result<()> {
        if self.started.load(Ordering::SeqCst) {
            return Err(Error::LoaderAfterConfigure {
                manager: self.kind.clone(),
            });
        }
        self.loader = Arc::new(loader);
        Ok(())
    }

    /// Registered setting names, sorted
    pub fn setting_names(&self) -> Vec<&str> {
        self.settings.keys().map(String::as_str).collect()
    }

    pub fn descriptor(&self, name: &str) -> Option<&SettingDescriptor> {
        self.settings.get(name)
    }

    /// Whether every descriptor has been resolved
    pub fn configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    /// Current readiness snapshot
    pub fn readiness(&self) -> Readiness {
        self.readiness.borrow().clone()
    }

    /// Read-only view of the backing data
    ///
    /// Empty until the loader has completed.
    pub fn data(&self) -> DataView {
        self.data.get().cloned().unwrap_or_default()
    }

    /// Mark the manager as about to configure so other managers can wait
    /// on it before its task gets scheduled
    pub(crate) fn schedule(&self) {
        if !self.configured() {
            self.store.set_phase(&self.kind, Phase::Running);
        }
    }

    /// Load backing data and resolve every registered descriptor
    ///
    /// Idempotent: once configured, further calls return immediately
    /// without loading again. After a failure a later call retries; the
    /// data snapshot is reused if the load itself had succeeded.
    ///
    /// # Errors
    ///
    /// - [`Error::LoadFailed`] if the loader fails
    /// - [`Error::Unresolved`] if resolution stalls
    pub async fn configure(&self) -> Result<()> {
        let _guard = self.configure_lock.lock().await;
        if self.configured() {
            return Ok(());
        }

        self.started.store(true, Ordering::SeqCst);
        self.readiness.send_if_modified(|state| {
            if matches!(state, Readiness::Failed(_)) {
                *state = Readiness::Pending;
                true
            } else {
                false
            }
        });
        self.store.set_phase(&self.kind, Phase::Running);

        match self.run().await {
            Ok(resolution) => {
                self.configured.store(true, Ordering::SeqCst);
                self.store.set_phase(&self.kind, Phase::Done);
                self.readiness.send_replace(Readiness::Ready);
                tracing::info!(
                    manager = %self.kind,
                    settings = resolution.resolved,
                    rounds = resolution.rounds,
                    "Settings manager configured"
                );
                Ok(())
            }
            Err(e) => {
                self.store.set_phase(&self.kind, Phase::Failed);
                self.readiness.send_replace(Readiness::Failed(e.clone()));
                tracing::warn!(
                    manager = %self.kind,
                    error = %e,
                    "Settings manager failed to configure"
                );
                Err(e)
            }
        }
    }

    async fn run(&self) -> Result<Resolution> {
        let data = match self.data.get() {
            Some(data) => data.clone(),
            None => {
                tracing::debug!(manager = %self.kind, "Loading backing data");
                let loaded = self.loader.load().await.map_err(|e| Error::LoadFailed {
                    manager: self.kind.clone(),
                    reason: e.to_string(),
                })?;
                self.data.get_or_init(|| DataView::new(loaded)).clone()
            }
        };

        engine::resolve(&self.kind, self.settings.values(), &self.store, &data).await
    }

    /// Wait until the manager is configured
    ///
    /// Returns immediately if it already is. Any number of tasks may wait
    /// concurrently; all are released together.
    ///
    /// # Errors
    ///
    /// Returns the failure of the configuration attempt being waited on.
    pub async fn wait(&self) -> Result<()> {
        let mut receiver = self.readiness.subscribe();
        let state = match receiver.wait_for(|state| !state.is_pending()).await {
            Ok(state) => state.clone(),
            Err(_) => Readiness::Pending,
        };

        match state {
            Readiness::Ready => Ok(()),
            Readiness::Failed(e) => Err(e),
            Readiness::Pending => Err(Error::NotConfigured {
                name: self.kind.clone(),
            }),
        }
    }
}

impl fmt::Debug for SourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceManager")
            .field("kind", &self.kind)
            .field("settings", &self.setting_names())
            .field("configured", &self.configured())
            .finish_non_exhaustive()
    }
}
