use schoolbase_agent::{connect_remote, open_local, AgentConfig};
use schoolbase_storage::SnapshotStore;
use schoolbase_sync::{RemoteStore, SyncConfig, FETCH_PAGE_SIZE};
use std::path::PathBuf;

#[test]
fn missing_fields_take_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(
        &path,
        r#"{"data_dir": "/var/lib/schoolbase", "remote": {"anon_key": "k"}, "sync": {"upsert_batch_size": 250}}"#,
    )
    .unwrap();

    let config = AgentConfig::load(&path).unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/var/lib/schoolbase"));
    assert_eq!(config.remote.anon_key, "k");
    assert_eq!(config.remote.timeout_secs, 60);
    assert_eq!(config.sync.upsert_batch_size, 250);
    assert_eq!(config.sync.page_size, FETCH_PAGE_SIZE);
    assert_eq!(config.local_quota_bytes, None);
}

#[test]
fn invalid_sync_settings_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(&path, r#"{"sync": {"page_size": 0}}"#).unwrap();

    assert!(AgentConfig::load(&path).is_err());
}

#[test]
fn unreadable_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("agent.json");
    std::fs::write(&path, "{ nope").unwrap();

    assert!(AgentConfig::load(&path).is_err());
    assert!(AgentConfig::load(&dir.path().join("missing.json")).is_err());
}

#[test]
fn postgrest_remote_requires_a_key() {
    let config = AgentConfig::default();
    assert!(connect_remote(&config, false).is_err());

    let memory = connect_remote(&config, true).unwrap();
    assert_eq!(memory.provider_name(), "memory");
}

#[test]
fn default_config_uses_default_sync_settings() {
    assert_eq!(AgentConfig::default().sync, SyncConfig::default());
}

#[tokio::test]
async fn local_store_writes_under_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };

    let local = open_local(&config);
    local.set("sms_students", "[]").await.unwrap();

    assert!(dir.path().join("sms_students.json").exists());
    assert_eq!(local.backend_name(), "file");
}
