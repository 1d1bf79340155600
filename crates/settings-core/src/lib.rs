//! Lazily resolved settings
//!
//! Settings whose values are only known once asynchronous data sources have
//! loaded. Each setting is declared with a [`SettingDescriptor`] that can:
//!
//! - **look up a key** in the backing data of the manager that owns it,
//! - **reference** another setting once that one is resolved,
//! - **fall back to a default**, literal or produced (sync or async).
//!
//! # Architecture
//!
//! ```text
//!                 SettingsRegistry
//!                        |
//!          +-------------+-------------+
//!          |                           |
//!    SourceManager               SourceManager     (one per data source,
//!     loader + data               loader + data     configured concurrently)
//!          |                           |
//!          +------ ResolutionEngine ---+
//!                        |
//!                  SettingsStore          (Unresolved | Resolved per name)
//! ```
//!
//! Each manager loads its data once, then resolves its descriptors in
//! rounds until none is pending or no round makes progress. A final stall
//! is reported as one [`Error::Unresolved`] listing missing keys and
//! circular or dangling references.
//!
//! Reads go through the store: a setting read before its descriptor is
//! resolved fails with [`Error::NotConfigured`].

pub mod bootstrap;
pub mod data;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod store;

pub use bootstrap::{Bootstrap, ModuleCatalog, SETTINGS_MODULE_ENV, init, init_from_env};
pub use data::{BackingData, DataView};
pub use descriptor::{BoxFuture, DEFAULT_KIND, DefaultValue, SettingDescriptor};
pub use engine::Resolution;
pub use error::{Error, Result};
pub use manager::{
    DataLoader, EmptyLoader, FnLoader, LoadError, ManagerSpec, Readiness, SourceManager, loader_fn,
};
pub use manifest::{SettingEntry, SettingsManifest};
pub use module::{Declaration, SettingsModule, is_setting_name, validate_setting_name};
pub use registry::SettingsRegistry;
pub use store::{Phase, SettingsStore, Slot};
