//! End-to-end behaviour of the configuration store against real files.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use scouter_conf::config::snapshot::{self, EXCLUDED_FIELDS};
use scouter_conf::config::{
    AgentSettings, ConfigStore, HostEnvironment, OverrideLayer, ReloadOutcome,
};
use scouter_conf::config::model::FIELDS;
use scouter_conf::notify::ObserverRegistry;
use tempfile::TempDir;

fn write_config(path: &Path, text: &str, mtime: SystemTime) {
    std::fs::write(path, text).unwrap();
    OpenOptions::new()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

fn conf_path(dir: &TempDir) -> PathBuf {
    dir.path().join("conf").join("scouter.conf")
}

fn store_for(path: &Path, overrides: OverrideLayer) -> Arc<ConfigStore> {
    ConfigStore::builder()
        .config_path(path)
        .overrides(overrides)
        .host(HostEnvironment::new("linux", "it-host"))
        .build()
}

#[test]
fn environment_beats_file_for_collector_address() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(&path, "net_collector_ip=10.0.0.1\n", SystemTime::now());

    let store = store_for(&path, OverrideLayer::new().with("net_collector_ip", "10.0.0.2"));

    assert_eq!(store.settings().net_collector_ip, "10.0.0.2");
}

#[test]
fn legacy_keys_fill_in_for_missing_primary_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(
        &path,
        "server.addr=172.16.0.4\nserver.port=6200\nudp.packet.max=8192\n",
        SystemTime::now(),
    );

    let settings = store_for(&path, OverrideLayer::new()).settings();

    assert_eq!(settings.net_collector_ip, "172.16.0.4");
    assert_eq!(settings.net_collector_udp_port, 6200);
    assert_eq!(settings.net_collector_tcp_port, 6200);
    assert_eq!(settings.net_udp_packet_max_bytes, 8192);
}

#[test]
fn substitution_uses_override_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(
        &path,
        "log_dir=${agent.home}/logs\ncounter_object_registry_path=${missing}/reg\n",
        SystemTime::now(),
    );

    let store = store_for(&path, OverrideLayer::new().with("agent.home", "/opt/agent"));
    let settings = store.settings();

    assert_eq!(settings.log_dir, "/opt/agent/logs");
    assert_eq!(settings.counter_object_registry_path, "${missing}/reg");
}

#[test]
fn second_reload_in_a_row_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(&path, "cpu_warning_pct=60\n", SystemTime::now());

    let store = store_for(&path, OverrideLayer::new());
    let before = store.current();

    assert!(!store.reload(false));
    assert_eq!(store.try_reload(false), ReloadOutcome::RateLimited);
    assert_eq!(*store.current(), *before);
}

#[test]
fn forced_reload_sees_edited_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    let first = SystemTime::now() - Duration::from_secs(3600);
    write_config(&path, "cpu_warning_pct=60\n", first);

    let store = store_for(&path, OverrideLayer::new());
    let first_load = store.last_load_time();
    assert_eq!(store.settings().cpu_warning_pct, 60);

    write_config(&path, "cpu_warning_pct=65\n", SystemTime::now());
    assert!(store.reload(true));

    assert_eq!(store.settings().cpu_warning_pct, 65);
    assert!(store.last_load_time() > first_load);
}

#[test]
fn observers_run_after_each_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(&path, "a=1\n", SystemTime::now() - Duration::from_secs(60));

    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(ObserverRegistry::new());
    let counter = Arc::clone(&calls);
    registry.register("count", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let store = ConfigStore::builder()
        .config_path(&path)
        .host(HostEnvironment::new("linux", "it-host"))
        .observer(registry)
        .build();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    write_config(&path, "a=2\n", SystemTime::now());
    store.reload(true);
    store.reload(true);

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn saved_text_is_loaded_on_next_reload() {
    let dir = TempDir::new().unwrap();
    let path = conf_path(&dir);

    let store = store_for(&path, OverrideLayer::new());
    assert_eq!(store.load_text(), None);
    assert_eq!(store.settings().disk_fatal_pct, 90);

    assert!(store.save_text("disk_fatal_pct=95\ndisk_ignore_names=/boot, /snap\n"));
    assert!(path.exists());
    assert!(store.reload(true));

    let settings = store.settings();
    assert_eq!(settings.disk_fatal_pct, 95);
    assert_eq!(settings.disk_ignore_names.len(), 2);
}

#[test]
fn untouched_config_snapshot_matches_defaults() {
    let dir = TempDir::new().unwrap();
    let store = store_for(&conf_path(&dir), OverrideLayer::new());

    let rows = store.snapshot();

    assert_eq!(rows.len(), FIELDS.len() - EXCLUDED_FIELDS.len());
    for row in &rows {
        assert_eq!(row.value, row.default, "row {} differs", row.key);
    }
}

#[test]
fn snapshot_reflects_live_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scouter.conf");
    write_config(&path, "mem_alert_enabled=TRUE\nlog_keep_days=oops\n", SystemTime::now());

    let rows = store_for(&path, OverrideLayer::new()).snapshot();
    let modified: Vec<&str> = rows.iter().filter(|r| r.is_modified()).map(|r| r.key).collect();

    assert_eq!(modified, vec!["mem_alert_enabled"]);
    assert_eq!(
        snapshot::snapshot(&AgentSettings::default()).len(),
        rows.len()
    );
}

#[test]
fn identity_uses_host_name_when_unset() {
    let dir = TempDir::new().unwrap();
    let store = store_for(&conf_path(&dir), OverrideLayer::new());
    let state = store.current();

    assert_eq!(state.identity.obj_type, "linux");
    assert_eq!(store.obj_name(), "/it-host");
    assert_eq!(state.settings.obj_name, "it-host");
}
