//! Data loaders for driving managers in tests.

use async_trait::async_trait;
use serde_json::Value;
use settings_core::{BackingData, DataLoader, LoadError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Build backing data from `(key, value)` pairs.
pub fn backing_data<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> BackingData {
    entries
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// Loader returning fixed data, optionally after a delay, and counting
/// how often it ran.
///
/// # Example
///
/// ```rust
/// use settings_test_utils::ScriptedLoader;
/// use serde_json::json;
/// use std::time::Duration;
///
/// let loader = ScriptedLoader::new([("db_url", json!("postgres://db"))])
///     .with_delay(Duration::from_millis(10));
/// assert_eq!(loader.loads(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ScriptedLoader {
    data: BackingData,
    delay: Option<Duration>,
    loads: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Self {
            data: backing_data(entries),
            delay: None,
            loads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Loader producing no data.
    pub fn empty() -> Self {
        Self::new(Vec::<(&str, Value)>::new())
    }

    /// Sleep for `delay` before returning the data.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of completed loads, shared between clones.
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Handle to the load counter, usable after the loader is moved.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }
}

#[async_trait]
impl DataLoader for ScriptedLoader {
    async fn load(&self) -> Result<BackingData, LoadError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.data.clone())
    }
}

/// Loader that always fails with `message`.
#[derive(Debug, Clone)]
pub struct FailingLoader {
    message: String,
}

impl FailingLoader {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl DataLoader for FailingLoader {
    async fn load(&self) -> Result<BackingData, LoadError> {
        Err(self.message.clone().into())
    }
}
