//! Object identity derived from configuration and the host.

use sha2::{Digest, Sha256};

use super::resolver::ResolvedProperties;

pub const HOST: &str = "host";
pub const LINUX: &str = "linux";
pub const WINDOWS: &str = "windows";
pub const OSX: &str = "osx";
pub const AIX: &str = "aix";
pub const HPUX: &str = "hpux";

/// Platform predicates, checked in order against the lowercase OS name.
const OS_FAMILIES: &[(fn(&str) -> bool, &str)] = &[
    (|os: &str| os.starts_with("linux"), LINUX),
    (|os: &str| os.starts_with("windows"), WINDOWS),
    (|os: &str| os.starts_with("mac") || os == "darwin", OSX),
    (|os: &str| os == "aix", AIX),
    (|os: &str| os == "hpux" || os == "hp-ux", HPUX),
];

/// Facts about the machine the agent runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub os: String,
    pub host_name: String,
}

impl HostEnvironment {
    pub fn new(os: impl Into<String>, host_name: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            host_name: host_name.into(),
        }
    }

    /// Reads the compile-target OS and the machine host name.
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS, hostname_or_default())
    }
}

/// Object type, name and hash, always computed together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedIdentity {
    /// Configured `obj_type`, or the detected OS family.
    pub obj_type: String,
    /// Configured `obj_name`, or the host name, without the leading `/`.
    pub configured_name: String,
    /// Effective object name, `/`-prefixed.
    pub obj_name: String,
    pub obj_hash: i32,
}

impl DerivedIdentity {
    pub fn derive(props: &ResolvedProperties, host: &HostEnvironment) -> Self {
        let obj_type = props.get("obj_type", detect_os_family(&host.os).to_string());
        let configured_name = props.get("obj_name", host.host_name.clone());
        let obj_name = format!("/{}", configured_name);
        let obj_hash = hash_name(&obj_name);

        Self {
            obj_type,
            configured_name,
            obj_name,
            obj_hash,
        }
    }
}

/// Maps an OS name to its family tag; unknown platforms are plain hosts.
pub fn detect_os_family(os: &str) -> &'static str {
    let os = os.to_ascii_lowercase();
    OS_FAMILIES
        .iter()
        .find(|(matches, _)| matches(os.as_str()))
        .map(|(_, family)| *family)
        .unwrap_or(HOST)
}

/// Stable 32-bit hash of an object name: the first four bytes of its SHA-256.
pub fn hash_name(name: &str) -> i32 {
    let digest = Sha256::digest(name.as_bytes());
    i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Helper to get hostname or a default value.
fn hostname_or_default() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .or_else(|| {
            std::fs::read_to_string("/etc/hostname")
                .ok()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
