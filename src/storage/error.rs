use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Errors returned by durable log operations.
pub enum StorageError {
    /// The log could not be opened or created (permissions, corruption, bad path).
    #[error("failed to open durable log at {path}: {reason}")]
    OpenFailed {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying error message.
        reason: String,
    },

    /// A put or delete did not commit.
    #[error("durable write failed for key '{key}': {reason}")]
    WriteFailed {
        /// Key being written.
        key: String,
        /// Underlying error message.
        reason: String,
    },

    /// Iterating the log failed.
    #[error("durable log read failed: {reason}")]
    ReadFailed {
        /// Underlying error message.
        reason: String,
    },

    /// A record could not be decoded into a vector.
    #[error("corrupt record for key '{key}': {reason}")]
    CorruptRecord {
        /// Key of the record.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Convenience result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
