//! Diagnostic view comparing live settings with compiled-in defaults.

use serde::Serialize;
use serde_json::{Map, Value};

use super::model::{AgentSettings, FIELDS};

/// Host-derived settings left out of the diagnostic rows.
///
/// Their live value comes from the machine (OS family, host name), so it would
/// never match the compiled default and every row would read as modified. They
/// stay readable through [`AgentSettings::field`].
pub const EXCLUDED_FIELDS: &[&str] = &["obj_type", "obj_name"];

/// One line of the diagnostic table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRow {
    pub key: &'static str,
    pub value: Value,
    pub default: Value,
}

impl SnapshotRow {
    /// True when the live value differs from the default.
    pub fn is_modified(&self) -> bool {
        self.value != self.default
    }
}

/// Builds rows for every declared setting except [`EXCLUDED_FIELDS`], in declaration order.
pub fn snapshot(current: &AgentSettings) -> Vec<SnapshotRow> {
    let defaults = AgentSettings::default();

    FIELDS
        .iter()
        .filter(|field| !EXCLUDED_FIELDS.contains(&field.name))
        .map(|field| SnapshotRow {
            key: field.name,
            value: (field.read)(current),
            default: (field.read)(&defaults),
        })
        .collect()
}

/// Column-oriented export: `{"key": [...], "value": [...], "default": [...]}`.
pub fn to_columns(rows: &[SnapshotRow]) -> Value {
    let mut columns = Map::new();
    columns.insert(
        "key".to_string(),
        rows.iter().map(|r| Value::from(r.key)).collect(),
    );
    columns.insert(
        "value".to_string(),
        rows.iter().map(|r| r.value.clone()).collect(),
    );
    columns.insert(
        "default".to_string(),
        rows.iter().map(|r| r.default.clone()).collect(),
    );
    Value::Object(columns)
}

/// Formats rows as an aligned text table. Modified rows are marked with `*`.
pub fn format_table(rows: &[SnapshotRow]) -> String {
    let cells: Vec<(String, String)> = rows
        .iter()
        .map(|r| (display_value(&r.value), display_value(&r.default)))
        .collect();

    let key_width = rows.iter().map(|r| r.key.len()).chain([3]).max().unwrap_or(3);
    let value_width = cells.iter().map(|(v, _)| v.len()).chain([5]).max().unwrap_or(5);

    let mut table = format!(
        "  {:<key_width$}  {:<value_width$}  {}\n",
        "KEY", "VALUE", "DEFAULT"
    );
    table.push_str(&format!(
        "  {}  {}  {}\n",
        "-".repeat(key_width),
        "-".repeat(value_width),
        "-".repeat(7)
    ));

    for (row, (value, default)) in rows.iter().zip(&cells) {
        let marker = if row.is_modified() { '*' } else { ' ' };
        table.push_str(&format!(
            "{} {:<key_width$}  {:<value_width$}  {}\n",
            marker, row.key, value, default
        ));
    }

    let modified = rows.iter().filter(|r| r.is_modified()).count();
    table.push_str(&format!("---\n{} setting(s), {} modified\n", rows.len(), modified));

    table
}

/// One `key : default` line per setting, as printed by `config-defaults`.
pub fn format_defaults() -> String {
    snapshot(&AgentSettings::default())
        .iter()
        .map(|row| format!("{} : {}\n", row.key, display_value(&row.default)))
        .collect()
}

/// Renders a value without JSON quoting for plain strings.
fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}
