//! Shared test utilities for the lazy-settings workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`loader`]: scripted data loaders with delays, counters and failures
//! - [`workspace`]: [`TestWorkspace`] for manifests and data files on disk

pub mod loader;
pub mod workspace;

pub use loader::{FailingLoader, ScriptedLoader, backing_data};
pub use workspace::TestWorkspace;
