//! Typed agent settings derived from resolved properties.

use std::collections::BTreeSet;

use serde_json::{json, Value};

use super::identity::DerivedIdentity;
use super::resolver::ResolvedProperties;

/// Default collector port for both UDP and TCP.
pub const SERVER_PORT: i32 = 6100;

/// Delimiter for set-valued settings.
const SET_DELIMITER: &str = ",";

/// Every operator-facing setting of the host agent, grouped as in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    // Network
    pub net_local_udp_ip: Option<String>,
    pub net_local_udp_port: i32,
    pub net_collector_ip: String,
    pub net_collector_udp_port: i32,
    pub net_collector_tcp_port: i32,
    pub net_collector_tcp_session_count: i32,
    pub net_collector_tcp_so_timeout_ms: i32,
    pub net_collector_tcp_connection_timeout_ms: i32,
    pub net_udp_packet_max_bytes: i32,

    // Object
    pub obj_type: String,
    pub obj_name: String,

    // Manager
    pub mgr_log_ignore_ids: BTreeSet<String>,

    // Counter
    pub counter_enabled: bool,
    pub counter_object_registry_path: String,

    // Log
    pub log_udp_object: bool,
    /// Key keeps its historical spelling so existing config files still apply.
    pub log_rotation_enalbed: bool,
    pub log_dir: String,
    pub log_keep_days: i32,

    // Disk
    pub disk_alert_enabled: bool,
    pub disk_warning_pct: i32,
    pub disk_fatal_pct: i32,
    pub disk_ignore_names: BTreeSet<String>,

    // Cpu
    pub cpu_alert_enabled: bool,
    pub cpu_check_period_ms: i64,
    pub cpu_alert_interval_ms: i64,
    pub cpu_warning_pct: i32,
    pub cpu_fatal_pct: i32,
    pub cpu_warning_history: i32,
    pub cpu_fatal_history: i32,
    pub _cpu_value_avg_sec: i32,

    // Memory
    pub mem_alert_enabled: bool,
    pub mem_alert_interval_ms: i64,
    pub mem_warning_pct: i32,
    pub mem_fatal_pct: i32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            net_local_udp_ip: None,
            net_local_udp_port: 0,
            net_collector_ip: "127.0.0.1".to_string(),
            net_collector_udp_port: SERVER_PORT,
            net_collector_tcp_port: SERVER_PORT,
            net_collector_tcp_session_count: 1,
            net_collector_tcp_so_timeout_ms: 60_000,
            net_collector_tcp_connection_timeout_ms: 3_000,
            net_udp_packet_max_bytes: 60_000,

            obj_type: String::new(),
            obj_name: String::new(),

            mgr_log_ignore_ids: BTreeSet::new(),

            counter_enabled: true,
            counter_object_registry_path: "/tmp/scouter".to_string(),

            log_udp_object: false,
            log_rotation_enalbed: true,
            log_dir: "./logs".to_string(),
            log_keep_days: 365,

            disk_alert_enabled: true,
            disk_warning_pct: 70,
            disk_fatal_pct: 90,
            disk_ignore_names: BTreeSet::new(),

            cpu_alert_enabled: true,
            cpu_check_period_ms: 300_000,
            cpu_alert_interval_ms: 30_000,
            cpu_warning_pct: 70,
            cpu_fatal_pct: 90,
            cpu_warning_history: 3,
            cpu_fatal_history: 3,
            _cpu_value_avg_sec: 10,

            mem_alert_enabled: false,
            mem_alert_interval_ms: 30_000,
            mem_warning_pct: 80,
            mem_fatal_pct: 90,
        }
    }
}

impl AgentSettings {
    /// Derives every setting from the resolved properties and identity.
    pub fn from_properties(p: &ResolvedProperties, identity: &DerivedIdentity) -> Self {
        let d = Self::default();

        Self {
            net_local_udp_ip: p.get_optional("net_local_udp_ip"),
            net_local_udp_port: p.get("net_local_udp_port", d.net_local_udp_port),
            net_collector_ip: p.get_or("net_collector_ip", "server.addr", d.net_collector_ip),
            net_collector_udp_port: p.get_or(
                "net_collector_udp_port",
                "server.port",
                d.net_collector_udp_port,
            ),
            net_collector_tcp_port: p.get_or(
                "net_collector_tcp_port",
                "server.port",
                d.net_collector_tcp_port,
            ),
            net_collector_tcp_session_count: p.get_int_min(
                "net_collector_tcp_session_count",
                d.net_collector_tcp_session_count,
                1,
            ),
            net_collector_tcp_so_timeout_ms: p.get(
                "net_collector_tcp_so_timeout_ms",
                d.net_collector_tcp_so_timeout_ms,
            ),
            net_collector_tcp_connection_timeout_ms: p.get(
                "net_collector_tcp_connection_timeout_ms",
                d.net_collector_tcp_connection_timeout_ms,
            ),
            net_udp_packet_max_bytes: p.get_or(
                "net_udp_packet_max_bytes",
                "udp.packet.max",
                d.net_udp_packet_max_bytes,
            ),

            obj_type: identity.obj_type.clone(),
            obj_name: identity.configured_name.clone(),

            mgr_log_ignore_ids: p.get_string_set("mgr_log_ignore_ids", SET_DELIMITER),

            counter_enabled: p.get("counter_enabled", d.counter_enabled),
            counter_object_registry_path: p.get(
                "counter_object_registry_path",
                d.counter_object_registry_path,
            ),

            log_udp_object: p.get("log_udp_object", d.log_udp_object),
            log_rotation_enalbed: p.get("log_rotation_enalbed", d.log_rotation_enalbed),
            log_dir: p.get("log_dir", d.log_dir),
            log_keep_days: p.get("log_keep_days", d.log_keep_days),

            disk_alert_enabled: p.get("disk_alert_enabled", d.disk_alert_enabled),
            disk_warning_pct: p.get("disk_warning_pct", d.disk_warning_pct),
            disk_fatal_pct: p.get("disk_fatal_pct", d.disk_fatal_pct),
            disk_ignore_names: p.get_string_set("disk_ignore_names", SET_DELIMITER),

            cpu_alert_enabled: p.get("cpu_alert_enabled", d.cpu_alert_enabled),
            cpu_check_period_ms: p.get("cpu_check_period_ms", d.cpu_check_period_ms),
            cpu_alert_interval_ms: p.get("cpu_alert_interval_ms", d.cpu_alert_interval_ms),
            cpu_warning_pct: p.get("cpu_warning_pct", d.cpu_warning_pct),
            cpu_fatal_pct: p.get("cpu_fatal_pct", d.cpu_fatal_pct),
            cpu_warning_history: p.get("cpu_warning_history", d.cpu_warning_history),
            cpu_fatal_history: p.get("cpu_fatal_history", d.cpu_fatal_history),
            _cpu_value_avg_sec: p.get("_cpu_value_avg_sec", d._cpu_value_avg_sec),

            mem_alert_enabled: p.get("mem_alert_enabled", d.mem_alert_enabled),
            mem_alert_interval_ms: p.get("mem_alert_interval_ms", d.mem_alert_interval_ms),
            mem_warning_pct: p.get("mem_warning_pct", d.mem_warning_pct),
            mem_fatal_pct: p.get("mem_fatal_pct", d.mem_fatal_pct),
        }
    }

    /// Looks up a declared field by name as a structured value.
    pub fn field(&self, name: &str) -> Option<Value> {
        FIELDS
            .iter()
            .find(|f| f.name == name)
            .map(|f| (f.read)(self))
    }
}

/// A declared setting: its key and how to read it from [`AgentSettings`].
pub struct FieldSpec {
    pub name: &'static str,
    pub read: fn(&AgentSettings) -> Value,
}

macro_rules! fields {
    ($($field:ident),* $(,)?) => {
        &[$(FieldSpec {
            name: stringify!($field),
            read: |s: &AgentSettings| json!(s.$field),
        }),*]
    };
}

/// All declared settings in declaration order.
pub const FIELDS: &[FieldSpec] = fields![
    net_local_udp_ip,
    net_local_udp_port,
    net_collector_ip,
    net_collector_udp_port,
    net_collector_tcp_port,
    net_collector_tcp_session_count,
    net_collector_tcp_so_timeout_ms,
    net_collector_tcp_connection_timeout_ms,
    net_udp_packet_max_bytes,
    obj_type,
    obj_name,
    mgr_log_ignore_ids,
    counter_enabled,
    counter_object_registry_path,
    log_udp_object,
    log_rotation_enalbed,
    log_dir,
    log_keep_days,
    disk_alert_enabled,
    disk_warning_pct,
    disk_fatal_pct,
    disk_ignore_names,
    cpu_alert_enabled,
    cpu_check_period_ms,
    cpu_alert_interval_ms,
    cpu_warning_pct,
    cpu_fatal_pct,
    cpu_warning_history,
    cpu_fatal_history,
    _cpu_value_avg_sec,
    mem_alert_enabled,
    mem_alert_interval_ms,
    mem_warning_pct,
    mem_fatal_pct,
];
