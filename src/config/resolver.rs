//! Merges the property file with process-level overrides.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use super::loader::PropertyMap;
use crate::error::ConfigError;

/// Environment variables and system properties captured once at startup.
///
/// Entries here win over the property file on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLayer {
    entries: BTreeMap<String, String>,
}

impl OverrideLayer {
    /// Creates an empty override layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures the process environment, then layers system properties on top.
    pub fn from_process<I>(system_properties: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));

        let mut layer = Self::new();
        layer.extend(env);
        layer.extend(system_properties);
        layer
    }

    /// Adds a single entry, replacing any previous value for the key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Returns the override value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

impl Extend<(String, String)> for OverrideLayer {
    fn extend<T: IntoIterator<Item = (String, String)>>(&mut self, iter: T) {
        self.entries.extend(iter);
    }
}

impl FromIterator<(String, String)> for OverrideLayer {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parses a `KEY=VALUE` system property definition.
pub fn parse_define(define: &str) -> Result<(String, String), ConfigError> {
    match define.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(ConfigError::InvalidDefine(define.to_string())),
    }
}

/// The merged, substituted configuration for one reload generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedProperties {
    entries: BTreeMap<String, String>,
}

impl ResolvedProperties {
    /// Raw value for a key, without trimming.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 over the sorted entries, hex encoded. Used to tag reloads in logs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (key, value) in &self.entries {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<(String, String)> for ResolvedProperties {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Merges file contents with the override layer and expands `${key}` references.
///
/// File values are trimmed. Overrides replace file entries with the same key.
/// References are expanded in a single pass against the merged raw values;
/// unknown references stay as written.
pub fn resolve(file: PropertyMap, overrides: &OverrideLayer) -> ResolvedProperties {
    let mut merged: BTreeMap<String, String> = file
        .into_iter()
        .map(|(key, value)| (key, value.trim().to_string()))
        .collect();

    for (key, value) in overrides.iter() {
        merged.insert(key.clone(), value.clone());
    }

    let entries = merged
        .iter()
        .map(|(key, value)| (key.clone(), substitute(value, &merged)))
        .collect();

    ResolvedProperties { entries }
}

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^{}]+)\}").expect("placeholder pattern is valid"))
}

fn substitute(value: &str, merged: &BTreeMap<String, String>) -> String {
    if !value.contains("${") {
        return value.to_string();
    }

    placeholder()
        .replace_all(value, |caps: &Captures| match merged.get(caps[1].trim()) {
            Some(found) => found.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(entries: &[(&str, &str)]) -> PropertyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn overrides_beat_file_values() {
        let overrides = OverrideLayer::new().with("net_collector_ip", "10.0.0.2");
        let resolved = resolve(file(&[("net_collector_ip", "10.0.0.1")]), &overrides);

        assert_eq!(resolved.raw("net_collector_ip"), Some("10.0.0.2"));
    }

    #[test]
    fn file_values_are_trimmed() {
        let resolved = resolve(file(&[("log_dir", "  /var/log/scouter  ")]), &OverrideLayer::new());
        assert_eq!(resolved.raw("log_dir"), Some("/var/log/scouter"));
    }

    #[test]
    fn expands_references_to_known_keys() {
        let overrides = OverrideLayer::new().with("SCOUTER_HOME", "/opt/scouter");
        let resolved = resolve(
            file(&[("log_dir", "${SCOUTER_HOME}/logs"), ("base", "x")]),
            &overrides,
        );

        assert_eq!(resolved.raw("log_dir"), Some("/opt/scouter/logs"));
    }

    #[test]
    fn unknown_references_are_left_verbatim() {
        let resolved = resolve(file(&[("log_dir", "${NOPE}/logs")]), &OverrideLayer::new());
        assert_eq!(resolved.raw("log_dir"), Some("${NOPE}/logs"));
    }

    #[test]
    fn expansion_is_a_single_pass() {
        let resolved = resolve(
            file(&[("a", "${b}"), ("b", "${c}"), ("c", "done")]),
            &OverrideLayer::new(),
        );

        assert_eq!(resolved.raw("a"), Some("${c}"));
        assert_eq!(resolved.raw("b"), Some("done"));
    }

    #[test]
    fn parse_define_splits_on_first_equals() {
        assert_eq!(
            parse_define("scouter.config=/etc/a=b.conf").unwrap(),
            ("scouter.config".to_string(), "/etc/a=b.conf".to_string())
        );
        assert!(matches!(parse_define("novalue"), Err(ConfigError::InvalidDefine(_))));
        assert!(matches!(parse_define("=x"), Err(ConfigError::InvalidDefine(_))));
    }

    #[test]
    fn system_properties_win_over_environment() {
        let layer = OverrideLayer::from_process(vec![("PATH".to_string(), "overridden".to_string())]);
        assert_eq!(layer.get("PATH"), Some("overridden"));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = resolve(file(&[("k", "1")]), &OverrideLayer::new());
        let b = resolve(file(&[("k", "1")]), &OverrideLayer::new());
        let c = resolve(file(&[("k", "2")]), &OverrideLayer::new());

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert!(ResolvedProperties::default().is_empty());
    }
}
