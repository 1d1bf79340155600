//! Fixed-point resolution of a manager's descriptors
//!
//! Descriptors do not declare dependency edges, only a reference target,
//! so resolution runs in rounds: every pending descriptor is tried once per
//! round and satisfied ones drop out. Reference chains converge across
//! rounds regardless of visiting order.
//!
//! A round that satisfies nothing is a stall. If some pending descriptor
//! references a setting owned by another manager that is still working,
//! the engine waits for the store to change and tries again; otherwise the
//! stall is final and reported as [`Error::Unresolved`].

use crate::data::DataView;
use crate::descriptor::{ResolutionOutcome, ResolveContext, SettingDescriptor};
use crate::store::{Phase, SettingsStore, Slot};
use crate::{Error, Result};

/// Summary of a successful resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Rounds run, including rounds repeated after waiting
    pub rounds: usize,
    /// Number of descriptors satisfied
    pub resolved: usize,
}

/// Resolve `descriptors` for `manager` against a frozen data snapshot
///
/// Rounds are not interrupted by other tasks except when an asynchronous
/// default producer is awaited, or when the engine waits on another
/// manager after a stall.
///
/// # Errors
///
/// Returns [`Error::Unresolved`] naming every setting left pending.
pub async fn resolve<'a, I>(
    manager: &str,
    descriptors: I,
    store: &SettingsStore,
    data: &DataView,
) -> Result<Resolution>
where
    I: IntoIterator<Item = &'a SettingDescriptor>,
{
    let mut pending: Vec<&SettingDescriptor> = descriptors.into_iter().collect();
    let total = pending.len();
    let ctx = ResolveContext { store, data };
    let mut changes = store.subscribe();
    let mut rounds = 0;

    while !pending.is_empty() {
        let seen = *changes.borrow_and_update();
        rounds += 1;

        let before = pending.len();
        let mut remaining = Vec::with_capacity(before);
        for descriptor in pending {
            if descriptor.resolve(&ctx).await == ResolutionOutcome::Unsatisfied {
                remaining.push(descriptor);
            }
        }
        pending = remaining;

        tracing::debug!(
            manager,
            round = rounds,
            satisfied = before - pending.len(),
            pending = pending.len(),
            "Resolution round finished"
        );

        if pending.len() < before {
            continue;
        }

        if waits_on_other_manager(manager, &pending, store) && store.try_block(manager, seen) {
            tracing::debug!(manager, "Stalled on another manager, waiting for progress");
            let changed = changes.changed().await;
            store.set_phase(manager, Phase::Running);
            if changed.is_ok() {
                continue;
            }
        }

        return Err(diagnose(manager, &pending));
    }

    Ok(Resolution {
        rounds,
        resolved: total,
    })
}

/// Whether a pending reference points at a setting another manager may
/// still publish
fn waits_on_other_manager(
    manager: &str,
    pending: &[&SettingDescriptor],
    store: &SettingsStore,
) -> bool {
    pending
        .iter()
        .filter_map(|descriptor| descriptor.reference_name())
        .any(|reference| match store.slot(reference) {
            Some(Slot::Unresolved { manager: owner }) if owner != manager => matches!(
                store.phase(&owner),
                Some(Phase::Running | Phase::Blocked)
            ),
            _ => false,
        })
}

/// Build the aggregated error for a final stall
///
/// A descriptor with both a key and a reference appears in both lists.
/// One with neither can only be pending for lack of a default and gets a
/// list of its own.
fn diagnose(manager: &str, pending: &[&SettingDescriptor]) -> Error {
    let mut missing_keys = Vec::new();
    let mut unresolved_refs = Vec::new();
    let mut without_source = Vec::new();

    for descriptor in pending {
        let name = descriptor.name().unwrap_or_default().to_string();
        let has_key = descriptor.lookup_key().is_some();
        let has_ref = descriptor.reference_name().is_some();

        if has_key {
            missing_keys.push(name.clone());
        }
        if has_ref {
            unresolved_refs.push(name.clone());
        }
        if !has_key && !has_ref {
            without_source.push(name);
        }
    }

    missing_keys.sort();
    unresolved_refs.sort();
    without_source.sort();

    tracing::warn!(
        manager,
        ?missing_keys,
        ?unresolved_refs,
        ?without_source,
        "Resolution stalled with unsatisfiable settings"
    );

    Error::Unresolved {
        manager: manager.to_string(),
        missing_keys,
        unresolved_refs,
        without_source,
    }
}
