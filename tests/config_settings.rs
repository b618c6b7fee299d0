use tempfile::TempDir;

use bookcase::{
    config::{AppConfig, SyncSettings},
    persist::StorageError,
    types::SortKey,
};

#[test]
fn missing_file_yields_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let config = AppConfig::load(tmp.path().join("absent.json")).expect("load");

    assert_eq!(config, AppConfig::default());
    assert_eq!(config.sort_method, SortKey::Title);
    assert!(!config.sync.is_active());
}

#[test]
fn save_then_load_round_trips() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("config.json");

    let config = AppConfig {
        sort_method: SortKey::Year,
        sync: SyncSettings {
            enabled: true,
            location: "/mnt/library".to_string(),
        },
    };
    config.save(&path).expect("save");

    assert_eq!(AppConfig::load(&path).expect("load"), config);
}

#[test]
fn empty_location_disables_sync_even_when_enabled() {
    let on = SyncSettings {
        enabled: true,
        location: "/mnt/library".to_string(),
    };
    let no_location = SyncSettings {
        enabled: true,
        location: String::new(),
    };
    let switched_off = SyncSettings {
        enabled: false,
        location: "/mnt/library".to_string(),
    };

    assert!(on.is_active());
    assert!(!no_location.is_active());
    assert!(!switched_off.is_active());
}

#[test]
fn malformed_config_is_a_format_error() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("config.json");
    std::fs::write(&path, b"{ sort_method: ").expect("write");

    assert!(matches!(
        AppConfig::load(&path),
        Err(StorageError::Format(_))
    ));
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("config.json");
    std::fs::write(&path, b"{\"sync\":{\"enabled\":true}}").expect("write");

    let config = AppConfig::load(&path).expect("load");
    assert_eq!(config.sort_method, SortKey::Title);
    assert!(config.sync.enabled);
    assert!(config.sync.location.is_empty());
}
