//! Setting descriptors
//!
//! A [`SettingDescriptor`] is the declarative rule for one lazily resolved
//! setting. It can name a lookup `key` in the manager's backing data, a
//! `reference` to another setting, and a default. When resolving, the first
//! of those three that yields a value wins, in that order.
//!
//! # Example
//!
//! ```
//! use settings_core::SettingDescriptor;
//! use serde_json::json;
//!
//! let replica = SettingDescriptor::new()
//!     .key("replica_url")
//!     .reference("DATABASE_URL")
//!     .default_value(json!("postgres://localhost/app"));
//!
//! assert_eq!(replica.lookup_key(), Some("replica_url"));
//! assert_eq!(replica.reference_name(), Some("DATABASE_URL"));
//! assert!(replica.has_default());
//! ```

use crate::data::DataView;
use crate::store::{SettingsStore, Slot};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Descriptor kind accepted by the default manager
pub const DEFAULT_KIND: &str = "simple";

/// Boxed future returned by asynchronous default producers
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Default used when neither the key nor the reference yields a value
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal value; `Value::Null` is a legitimate default
    Value(Value),
    /// A synchronous producer invoked at resolution time
    Sync(Arc<dyn Fn() -> Value + Send + Sync>),
    /// An asynchronous producer awaited at resolution time
    Async(Arc<dyn Fn() -> BoxFuture<Value> + Send + Sync>),
}

impl DefaultValue {
    async fn produce(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Sync(producer) => producer(),
            Self::Async(producer) => producer().await,
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Sync(_) => f.write_str("Sync(<fn>)"),
            Self::Async(_) => f.write_str("Async(<fn>)"),
        }
    }
}

/// Result of one resolution attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolutionOutcome {
    Satisfied,
    /// Nothing produced a value yet; retried in the next round
    Unsatisfied,
}

/// What a descriptor may see while resolving
pub(crate) struct ResolveContext<'a> {
    pub store: &'a SettingsStore,
    pub data: &'a DataView,
}

/// Declarative resolution rule for one setting
#[derive(Debug, Clone)]
pub struct SettingDescriptor {
    /// Bound once on registration
    name: Option<String>,
    key: Option<String>,
    reference: Option<String>,
    /// `None` means "no default", as opposed to a default of null
    default: Option<DefaultValue>,
    kind: String,
}

impl Default for SettingDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingDescriptor {
    /// Create a descriptor with no key, reference or default
    ///
    /// Such a descriptor can never resolve; it is reported when
    /// resolution stalls.
    pub fn new() -> Self {
        Self {
            name: None,
            key: None,
            reference: None,
            default: None,
            kind: DEFAULT_KIND.to_string(),
        }
    }

    /// Look the value up under `key` in the manager's backing data
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Copy the value of another setting once it is resolved
    pub fn reference(mut self, name: impl Into<String>) -> Self {
        self.reference = Some(name.into());
        self
    }

    /// Fall back to a literal value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    /// Fall back to the result of a synchronous producer
    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Sync(Arc::new(producer)));
        self
    }

    /// Fall back to the result of an asynchronous producer
    pub fn default_async<F, Fut>(mut self, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        self.default = Some(DefaultValue::Async(Arc::new(move || {
            Box::pin(producer()) as BoxFuture<Value>
        })));
        self
    }

    /// Set the descriptor kind, which selects the manager that owns it
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Name bound at registration, `None` before that
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn lookup_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn reference_name(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Default used when the key and the reference yield nothing
    pub fn fallback(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn descriptor_kind(&self) -> &str {
        &self.kind
    }

    pub(crate) fn bind(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Try to produce a value and publish it into the store
    ///
    /// Never fails: an attempt that finds nothing yet is `Unsatisfied`
    /// and will be retried by the engine.
    pub(crate) async fn resolve(&self, ctx: &ResolveContext<'_>) -> ResolutionOutcome {
        let Some(name) = self.name.as_deref() else {
            return ResolutionOutcome::Unsatisfied;
        };

        if let Some(key) = &self.key {
            if let Some(value) = ctx.data.get(key) {
                ctx.store.publish(name, value.clone());
                return ResolutionOutcome::Satisfied;
            }
        }

        if let Some(reference) = &self.reference {
            if let Some(Slot::Resolved(value)) = ctx.store.slot(reference) {
                ctx.store.publish(name, value);
                return ResolutionOutcome::Satisfied;
            }
        }

        match &self.default {
            Some(default) => {
                let value = default.produce().await;
                ctx.store.publish(name, value);
                ResolutionOutcome::Satisfied
            }
            None => ResolutionOutcome::Unsatisfied,
        }
    }
}
