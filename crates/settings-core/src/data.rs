//! Backing data produced by a manager's loader

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Flat mapping from lookup key to value, as returned by a loader
pub type BackingData = HashMap<String, Value>;

/// Read-only, cheaply cloneable view over frozen backing data
///
/// A view is created once per manager after its loader completes and is
/// never written to again. Before that, managers hand out an empty view.
#[derive(Debug, Clone, Default)]
pub struct DataView {
    inner: Arc<BackingData>,
}

impl DataView {
    /// Freeze loaded data into a view
    pub fn new(data: BackingData) -> Self {
        Self {
            inner: Arc::new(data),
        }
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Check if a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Sorted list of keys
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Iterate over entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.inner.iter()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl From<BackingData> for DataView {
    fn from(data: BackingData) -> Self {
        Self::new(data)
    }
}
