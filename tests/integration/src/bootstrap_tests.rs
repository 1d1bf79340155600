//! Process-level bootstrap
//!
//! Kept in its own test binary: the process allows a single successful
//! initialization, so only one test may perform it.

use serde_json::json;
use settings_core::{Error, ModuleCatalog, SettingDescriptor, SettingsModule, init};

fn catalog() -> ModuleCatalog {
    ModuleCatalog::new().register("app.settings", || {
        SettingsModule::new("app.settings")
            .declare("TIMEOUT", SettingDescriptor::new().default_value(30))
            .declare("RETRY_TIMEOUT", SettingDescriptor::new().reference("TIMEOUT"))
    })
}

#[tokio::test]
async fn test_process_initializes_once() {
    let err = init("missing.settings", &catalog()).unwrap_err();
    assert!(matches!(err, Error::UnknownModule { .. }));

    let registry = init("app.settings", &catalog()).unwrap();
    registry.wait().await.unwrap();
    assert_eq!(registry.get("RETRY_TIMEOUT").unwrap(), json!(30));

    let err = init("app.settings", &catalog()).unwrap_err();
    assert_eq!(err, Error::AlreadyInitialized);
    assert!(err.is_configuration_error());
}
