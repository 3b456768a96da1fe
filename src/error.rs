//! Error types for the configuration store.
//!
//! These never cross the store's public accessors: the store converts them into
//! defaults, `bool` results or `Option`s. They surface only in the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading, saving and startup errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid system property '{0}', expected KEY=VALUE")]
    InvalidDefine(String),

    #[error("Configuration store is already initialized")]
    AlreadyInitialized,
}
