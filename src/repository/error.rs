use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
/// Errors returned by [`EmbeddingRepository`](super::EmbeddingRepository) operations.
pub enum RepositoryError {
    #[error("durable log error: {0}")]
    Storage(#[from] StorageError),

    #[error("corrupt record '{key}' in durable log: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("key already exists: '{key}'")]
    KeyExists { key: String },

    #[error("key not found: '{key}'")]
    KeyNotFound { key: String },

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature vector is empty")]
    EmptyVector,

    #[error("feature component {index} is not finite")]
    NonFiniteFeature { index: usize },
}

/// Convenience result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;
