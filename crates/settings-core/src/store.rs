//! Shared settings store
//!
//! The store is the single place application code reads settings from. Each
//! name maps to a [`Slot`]: either a placeholder for a descriptor that has
//! not been resolved yet, or the concrete resolved value. Reading a
//! placeholder is an error rather than a silent default.
//!
//! The store also tracks the [`Phase`] of every manager attached to it so
//! the resolution engine can tell whether a reference into another manager
//! may still be satisfied later.

use crate::{Error, Result};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::watch;

/// Contents stored under one setting name
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Declared through a descriptor owned by `manager`, not resolved yet
    Unresolved { manager: String },
    /// Concrete value, either explicit or produced by resolution
    Resolved(Value),
}

impl Slot {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Lifecycle phase of a manager, as seen by other managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Attached but not configuring
    Idle,
    /// Loading data or running resolution rounds
    Running,
    /// Stalled, waiting for another manager to publish values
    Blocked,
    /// All settings resolved
    Done,
    /// Last configuration attempt failed
    Failed,
}

/// Associative store of settings shared by all managers of a registry
#[derive(Debug)]
pub struct SettingsStore {
    slots: RwLock<HashMap<String, Slot>>,
    phases: Mutex<HashMap<String, Phase>>,
    /// Bumped whenever a value is published or a manager finishes
    version: watch::Sender<u64>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            slots: RwLock::new(HashMap::new()),
            phases: Mutex::new(HashMap::new()),
            version,
        }
    }

    /// Read a resolved setting
    ///
    /// # Errors
    ///
    /// - [`Error::NotConfigured`] if the setting is still a placeholder
    /// - [`Error::UnknownSetting`] if nothing was declared under `name`
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.slots.read().get(name) {
            Some(Slot::Resolved(value)) => Ok(value.clone()),
            Some(Slot::Unresolved { .. }) => Err(Error::NotConfigured {
                name: name.to_string(),
            }),
            None => Err(Error::UnknownSetting {
                name: name.to_string(),
            }),
        }
    }

    /// Read a resolved setting and convert it to `T`
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get(name)?;
        serde_json::from_value(value).map_err(|e| Error::Deserialize {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    /// Current slot for `name`, if declared
    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.read().contains_key(name)
    }

    /// Whether `name` holds a concrete value
    pub fn is_resolved(&self, name: &str) -> bool {
        self.slots
            .read()
            .get(name)
            .is_some_and(Slot::is_resolved)
    }

    /// All resolved settings, sorted by name
    pub fn resolved(&self) -> BTreeMap<String, Value> {
        self.slots
            .read()
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Resolved(value) => Some((name.clone(), value.clone())),
                Slot::Unresolved { .. } => None,
            })
            .collect()
    }

    /// Names still waiting on a descriptor, sorted
    pub fn pending(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| !slot.is_resolved())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Install a placeholder for a descriptor owned by `manager`
    pub(crate) fn declare(&self, name: &str, manager: &str) {
        self.slots.write().insert(
            name.to_string(),
            Slot::Unresolved {
                manager: manager.to_string(),
            },
        );
    }

    /// Store an explicit value that needs no resolution
    pub(crate) fn set_explicit(&self, name: &str, value: Value) {
        self.slots
            .write()
            .insert(name.to_string(), Slot::Resolved(value));
    }

    /// Publish a resolved value and wake managers waiting on the store
    pub(crate) fn publish(&self, name: &str, value: Value) {
        self.slots
            .write()
            .insert(name.to_string(), Slot::Resolved(value));
        let mut phases = self.phases.lock();
        release_blocked(&mut phases);
        self.bump();
    }

    pub(crate) fn attach(&self, manager: &str) {
        self.phases
            .lock()
            .entry(manager.to_string())
            .or_insert(Phase::Idle);
    }

    /// Phase of `manager`, or `None` if it never attached
    pub fn phase(&self, manager: &str) -> Option<Phase> {
        self.phases.lock().get(manager).copied()
    }

    pub(crate) fn set_phase(&self, manager: &str, phase: Phase) {
        let mut phases = self.phases.lock();
        phases.insert(manager.to_string(), phase);
        if matches!(phase, Phase::Done | Phase::Failed) {
            release_blocked(&mut phases);
            self.bump();
        }
    }

    /// Mark `manager` as blocked if some other manager is still running
    ///
    /// `seen` is the store version the caller last resolved against. If the
    /// store moved on since, the caller may wait without blocking, since its
    /// wakeup is already pending. Returns `false` (and leaves the phase
    /// untouched) when no other manager can make progress, in which case
    /// waiting would never end. The check and the transition happen under
    /// one lock so two stalled managers cannot both decide to wait on each
    /// other.
    pub(crate) fn try_block(&self, manager: &str, seen: u64) -> bool {
        let mut phases = self.phases.lock();
        if *self.version.borrow() != seen {
            return true;
        }
        let others_running = phases
            .iter()
            .any(|(name, phase)| name != manager && *phase == Phase::Running);
        if others_running {
            phases.insert(manager.to_string(), Phase::Blocked);
        }
        others_running
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump(&self) {
        self.version.send_modify(|version| *version = version.wrapping_add(1));
    }
}

/// Every blocked manager is about to be woken and must count as running
/// from now on, before its task is polled again
fn release_blocked(phases: &mut HashMap<String, Phase>) {
    for phase in phases.values_mut() {
        if *phase == Phase::Blocked {
            *phase = Phase::Running;
        }
    }
}
