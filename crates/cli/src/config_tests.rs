// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use tempfile::TempDir;

#[test]
fn init_and_load_config() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("data");
    init_data_dir(&dir, &Config::new("coach@example.org").unwrap()).unwrap();

    let config = Config::load(&dir).unwrap();
    assert_eq!(config.owner_id, "coach@example.org");
    assert_eq!(config.remote, RemoteConfig::default());
    assert_eq!(config.sync, SyncConfig::default());
}

#[test]
fn already_initialized() {
    let temp = TempDir::new().unwrap();
    let config = Config::new("coach").unwrap();
    init_data_dir(temp.path(), &config).unwrap();

    let err = init_data_dir(temp.path(), &config).unwrap_err();
    assert!(err.to_string().contains("already initialized"));
}

#[test]
fn load_missing_config_is_not_initialized() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(Config::load(temp.path()), Err(Error::NotInitialized)));
}

#[test]
fn load_invalid_toml() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("config.toml"), "owner_id = [").unwrap();
    let err = Config::load(temp.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn blank_owner_is_rejected() {
    assert!(Config::new("  ").is_err());
}

#[test]
fn partial_config_uses_defaults() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("config.toml"),
        "owner_id = \"coach\"\n\n[remote]\nurl = \"ws://remote:9000\"\n\n[sync]\nreconcile_interval_secs = 0\n",
    )
    .unwrap();

    let config = Config::load(temp.path()).unwrap();
    assert_eq!(config.remote.url, "ws://remote:9000");
    assert_eq!(config.remote.request_timeout_ms, 5_000);
    assert_eq!(config.sync.membership_batch_size, 50);

    let options = config.sync_options();
    assert_eq!(options.reconcile_interval, None);
    assert_eq!(options.debounce, Duration::from_millis(500));
}

#[test]
fn save_and_reload_roundtrip() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::new("coach").unwrap();
    config.sync.debounce_ms = 1_000;
    config.save(temp.path()).unwrap();

    assert_eq!(Config::load(temp.path()).unwrap(), config);
}

#[test]
fn gateway_config_converts_units() {
    let mut config = Config::new("coach").unwrap();
    config.remote.request_timeout_ms = 1_500;
    config.remote.connect_timeout_secs = 3;

    let gateway = config.gateway_config();
    assert_eq!(gateway.request_timeout, Duration::from_millis(1_500));
    assert_eq!(gateway.connect_timeout, Duration::from_secs(3));
}

#[test]
fn zero_batch_size_is_clamped() {
    let mut config = Config::new("coach").unwrap();
    config.sync.membership_batch_size = 0;
    assert_eq!(config.sync_options().membership_batch_size, 1);
}

#[test]
fn explicit_data_dir_wins() {
    let dir = resolve_data_dir(Some(Path::new("/tmp/rc"))).unwrap();
    assert_eq!(dir, PathBuf::from("/tmp/rc"));
    assert_eq!(cache_db_path(&dir), PathBuf::from("/tmp/rc/cache.db"));
    assert_eq!(pending_log_path(&dir), PathBuf::from("/tmp/rc/pending.jsonl"));
}
