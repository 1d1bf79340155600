//! End-to-end registry scenarios with several managers
//!
//! These tests exercise concurrent configuration: delayed loaders,
//! references that cross manager boundaries, and failures that must reach
//! every waiter without deadlocking.

use pretty_assertions::assert_eq;
use serde_json::json;
use settings_core::{
    Error, ManagerSpec, Phase, Readiness, SettingDescriptor, SettingsModule, SettingsRegistry,
};
use settings_test_utils::{FailingLoader, ScriptedLoader};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const DEADLINE: Duration = Duration::from_secs(5);

/// `local` resolves in its first round except for `MIRROR`, which needs the
/// tail of a three-link chain owned by the slower `remote` manager.
fn cross_manager_module() -> SettingsModule {
    SettingsModule::new("app.settings")
        .declare("EARLY", SettingDescriptor::new().kind("local").default_value("early"))
        .declare("MIRROR", SettingDescriptor::new().kind("local").reference("R3"))
        .declare("R3", SettingDescriptor::new().kind("remote").reference("R2"))
        .declare("R2", SettingDescriptor::new().kind("remote").reference("R1"))
        .declare("R1", SettingDescriptor::new().kind("remote").key("r1"))
        .declare("DEBUG", json!(false))
}

fn cross_manager_specs(remote_delay: Duration) -> Vec<ManagerSpec> {
    vec![
        ManagerSpec::new("local").with_loader(ScriptedLoader::empty()),
        ManagerSpec::new("remote").with_loader(
            ScriptedLoader::new([("r1", json!("from-remote"))]).with_delay(remote_delay),
        ),
    ]
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_aggregate_wait_returns_after_every_manager_converges() {
    let registry = SettingsRegistry::initialize(
        cross_manager_specs(Duration::from_millis(50)),
        cross_manager_module(),
    )
    .unwrap();

    assert_eq!(
        registry.get("MIRROR"),
        Err(Error::NotConfigured {
            name: "MIRROR".to_string()
        })
    );

    timeout(DEADLINE, registry.wait()).await.unwrap().unwrap();

    assert!(registry.configured());
    for manager in registry.managers() {
        assert_eq!(manager.readiness(), Readiness::Ready);
        assert_eq!(registry.store().phase(manager.kind()), Some(Phase::Done));
    }
    assert_eq!(registry.get("EARLY").unwrap(), json!("early"));
    assert_eq!(registry.get("MIRROR").unwrap(), json!("from-remote"));
    assert_eq!(registry.get("R3").unwrap(), json!("from-remote"));
    assert_eq!(registry.get("DEBUG").unwrap(), json!(false));
    assert!(registry.store().pending().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_waiters_never_observe_partial_state() {
    let registry = Arc::new(
        SettingsRegistry::initialize(
            cross_manager_specs(Duration::from_millis(30)),
            cross_manager_module(),
        )
        .unwrap(),
    );

    let waiters: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry.wait().await?;
                // Everything must already be readable once wait returns.
                registry.get("MIRROR")
            })
        })
        .collect();

    for waiter in waiters {
        let value = timeout(DEADLINE, waiter).await.unwrap().unwrap().unwrap();
        assert_eq!(value, json!("from-remote"));
    }
}

#[tokio::test]
async fn test_cross_manager_references_on_current_thread() {
    let registry = SettingsRegistry::initialize(
        cross_manager_specs(Duration::from_millis(10)),
        cross_manager_module(),
    )
    .unwrap();

    timeout(DEADLINE, registry.wait()).await.unwrap().unwrap();
    assert_eq!(registry.get("MIRROR").unwrap(), json!("from-remote"));
}

/// `a` needs `c`, `b` needs `a`; `b` and `c` load after `delay`.
fn three_manager_chain(delay: Duration) -> (Vec<ManagerSpec>, SettingsModule) {
    let specs = vec![
        ManagerSpec::new("a").with_loader(ScriptedLoader::empty()),
        ManagerSpec::new("b").with_loader(ScriptedLoader::empty().with_delay(delay)),
        ManagerSpec::new("c")
            .with_loader(ScriptedLoader::new([("x", json!("from-c"))]).with_delay(delay)),
    ];
    let module = SettingsModule::new("app.settings")
        .declare("AY", SettingDescriptor::new().kind("a").reference("CX"))
        .declare("BZ", SettingDescriptor::new().kind("b").reference("AY"))
        .declare("CX", SettingDescriptor::new().kind("c").key("x"));
    (specs, module)
}

async fn assert_three_manager_chain_converges(delay: Duration) {
    let (specs, module) = three_manager_chain(delay);
    let registry = SettingsRegistry::initialize(specs, module).unwrap();

    let result = timeout(DEADLINE, registry.wait()).await.unwrap();

    assert_eq!(result, Ok(()), "delay {delay:?}");
    for name in ["AY", "BZ", "CX"] {
        assert_eq!(registry.get(name).unwrap(), json!("from-c"), "delay {delay:?}");
    }
}

#[tokio::test]
async fn test_three_manager_chain_converges_on_current_thread() {
    for millis in [0, 1, 5, 10, 20, 30] {
        assert_three_manager_chain_converges(Duration::from_millis(millis)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_three_manager_chain_converges_on_multi_thread() {
    for millis in [0, 1, 5, 10, 20, 30] {
        assert_three_manager_chain_converges(Duration::from_millis(millis)).await;
    }
}

#[tokio::test]
async fn test_managers_sharing_a_kind_are_rejected() {
    let module = SettingsModule::new("app.settings")
        .declare("A", SettingDescriptor::new().kind("vault").key("x"))
        .declare("B", SettingDescriptor::new().reference("A"));
    let specs = vec![
        ManagerSpec::simple(),
        ManagerSpec::new("vault").with_loader(
            ScriptedLoader::new([("x", json!(1))]).with_delay(Duration::from_millis(30)),
        ),
        ManagerSpec::new("vault"),
    ];

    let err = SettingsRegistry::initialize(specs, module).unwrap_err();

    assert_eq!(
        err,
        Error::DuplicateManager {
            kind: "vault".to_string()
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cross_manager_cycle_fails_without_deadlock() {
    let module = SettingsModule::new("app.settings")
        .declare("A", SettingDescriptor::new().kind("local").reference("B"))
        .declare("B", SettingDescriptor::new().kind("remote").reference("A"));
    let registry = SettingsRegistry::initialize(
        vec![ManagerSpec::new("local"), ManagerSpec::new("remote")],
        module,
    )
    .unwrap();

    let err = timeout(DEADLINE, registry.wait()).await.unwrap().unwrap_err();

    assert!(err.is_unresolved());
    for manager in registry.managers() {
        assert!(matches!(manager.readiness(), Readiness::Failed(_)));
    }
    assert!(registry.get("A").is_err());
    assert!(registry.get("B").is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_source_releases_dependent_manager() {
    let module = SettingsModule::new("app.settings")
        .declare("LOCAL", SettingDescriptor::new().kind("local").reference("SECRET"))
        .declare("SECRET", SettingDescriptor::new().kind("vault").key("secret"));
    let registry = SettingsRegistry::initialize(
        vec![
            ManagerSpec::new("local"),
            ManagerSpec::new("vault").with_loader(FailingLoader::new("vault sealed")),
        ],
        module,
    )
    .unwrap();

    let err = timeout(DEADLINE, registry.wait()).await.unwrap().unwrap_err();

    // The first manager in declaration order reports its own failure.
    assert_eq!(
        err,
        Error::Unresolved {
            manager: "local".to_string(),
            missing_keys: vec![],
            unresolved_refs: vec!["LOCAL".to_string()],
            without_source: vec![],
        }
    );
    let vault = registry.manager("vault").unwrap();
    assert_eq!(
        vault.wait().await.unwrap_err(),
        Error::LoadFailed {
            manager: "vault".to_string(),
            reason: "vault sealed".to_string(),
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reference_to_explicit_value_resolves_in_any_manager() {
    let module = SettingsModule::new("app.settings")
        .declare("REGION", json!("eu-west-1"))
        .declare("BUCKET_REGION", SettingDescriptor::new().kind("remote").reference("REGION"))
        .declare("QUEUE_REGION", SettingDescriptor::new().reference("BUCKET_REGION"));
    let registry = SettingsRegistry::initialize(
        vec![ManagerSpec::simple(), ManagerSpec::new("remote")],
        module,
    )
    .unwrap();

    timeout(DEADLINE, registry.wait()).await.unwrap().unwrap();

    assert!(registry.is_overridden("REGION"));
    assert!(!registry.is_overridden("QUEUE_REGION"));
    assert_eq!(registry.get_as::<String>("QUEUE_REGION").unwrap(), "eu-west-1");
}
