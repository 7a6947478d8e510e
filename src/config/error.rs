//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::encoder::EncodeError;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Device kind is neither `host` nor `remote`.
    #[error("invalid device '{value}': expected 'host' or 'remote'")]
    InvalidDevice { value: String },

    /// A numeric setting could not be parsed or is out of range.
    #[error("invalid value '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },

    /// Model family name is not recognised.
    #[error("invalid model family: {source}")]
    InvalidModelFamily {
        #[source]
        source: EncodeError,
    },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },
}
