//! Typed reads over resolved properties.
//!
//! Every accessor returns a value: absent keys and unparseable strings fall
//! back to the caller's default.

use std::collections::BTreeSet;

use super::resolver::ResolvedProperties;

/// A type that can be read from a raw property string.
pub trait PropertyValue: Sized {
    /// Parses an already trimmed value, or `None` when it does not fit the type.
    fn parse_property(raw: &str) -> Option<Self>;
}

impl PropertyValue for String {
    fn parse_property(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl PropertyValue for i32 {
    fn parse_property(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl PropertyValue for i64 {
    fn parse_property(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl PropertyValue for bool {
    fn parse_property(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

impl ResolvedProperties {
    /// Trimmed value for a key.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.raw(key).map(str::trim)
    }

    /// Reads `key` as `T`, or returns `default`.
    pub fn get<T: PropertyValue>(&self, key: &str, default: T) -> T {
        match self.value(key).and_then(T::parse_property) {
            Some(parsed) => parsed,
            None => default,
        }
    }

    /// Reads `key`, falling back to the legacy `secondary` key, then `default`.
    pub fn get_or<T: PropertyValue>(&self, key: &str, secondary: &str, default: T) -> T {
        let fallback = self.get(secondary, default);
        self.get(key, fallback)
    }

    /// Reads an integer clamped to be no less than `min`.
    pub fn get_int_min(&self, key: &str, default: i32, min: i32) -> i32 {
        self.get(key, default).max(min)
    }

    /// Reads an optional string; `None` when the key is absent.
    pub fn get_optional(&self, key: &str) -> Option<String> {
        self.value(key).map(str::to_string)
    }

    /// Splits a delimited value into a set of trimmed, non-empty tokens.
    pub fn get_string_set(&self, key: &str, delimiter: &str) -> BTreeSet<String> {
        self.value(key)
            .map(|v| split_set(v, delimiter))
            .unwrap_or_default()
    }
}

/// Splits on `delimiter`, trims each token and drops empties.
pub fn split_set(value: &str, delimiter: &str) -> BTreeSet<String> {
    value
        .split(delimiter)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
