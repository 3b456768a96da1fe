//! Property file loading and parsing.
//!
//! The backing file uses the classic `.properties` layout: one `key=value`
//! (or `key: value`, or `key value`) entry per logical line, `#`/`!` comments,
//! backslash line continuations and `\t \n \r \f \\ \uXXXX` escapes.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Flat key → raw value mapping read from a property file.
pub type PropertyMap = BTreeMap<String, String>;

/// Reads the whole property file as text.
pub fn read_text(path: &Path) -> Result<String, ConfigError> {
    let bytes = std::fs::read(path).map_err(|e| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Replaces the property file with `text`, creating parent directories first.
///
/// The text goes to a temporary file next to the target which is then renamed
/// over it, so readers never see a half-written file.
pub fn write_text(path: &Path, text: &str) -> Result<(), ConfigError> {
    let write_failed = |source: std::io::Error| ConfigError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(text.as_bytes()).map_err(write_failed)?;
    tmp.as_file().sync_all().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    Ok(())
}

/// Loads the property file from disk.
///
/// A missing file is an empty configuration. An unreadable one is logged and
/// also treated as empty.
pub fn load_from_path(path: &Path) -> PropertyMap {
    if !path.exists() {
        debug!(?path, "Config file not found, using defaults");
        return PropertyMap::new();
    }

    match read_text(path) {
        Ok(text) => parse_properties(&text),
        Err(e) => {
            warn!(error = %e, "Config file unreadable, using defaults");
            PropertyMap::new()
        }
    }
}

/// Parses property file text. Malformed entries are skipped one at a time.
pub fn parse_properties(text: &str) -> PropertyMap {
    let mut props = PropertyMap::new();

    for (line_no, line) in logical_lines(text) {
        match parse_entry(&line) {
            Some((key, value)) => {
                props.insert(key, value);
            }
            None => debug!(line = line_no, "Skipping malformed property line"),
        }
    }

    props
}

/// Joins continued lines and drops blanks and comments.
///
/// Each logical line is tagged with the 1-based number of its first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim_start();

        let (start, mut buf) = match pending.take() {
            Some(open) => open,
            None => {
                if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                    continue;
                }
                (idx + 1, String::new())
            }
        };

        if ends_with_continuation(line) {
            buf.push_str(&line[..line.len() - 1]);
            pending = Some((start, buf));
        } else {
            buf.push_str(line);
            lines.push((start, buf));
        }
    }

    if let Some(open) = pending {
        lines.push(open);
    }

    lines
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Splits a logical line into an unescaped key and value.
fn parse_entry(line: &str) -> Option<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut escaped = false;

    while i < chars.len() {
        let c = chars[i];
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            break;
        }
        i += 1;
    }
    let key_end = i;

    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i < chars.len() && (chars[i] == '=' || chars[i] == ':') {
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
    }

    let raw_key: String = chars[..key_end].iter().collect();
    let raw_value: String = chars[i..].iter().collect();

    let key = unescape(&raw_key)?;
    if key.is_empty() {
        return None;
    }
    let value = unescape(&raw_value)?;

    Some((key, value))
}

/// Resolves backslash escapes. Returns `None` on a broken `\u` sequence.
fn unescape(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.chars().count() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                    return None;
                }
                let code = u32::from_str_radix(&hex, 16).ok()?;
                out.push(char::from_u32(code)?);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Some(out)
}
