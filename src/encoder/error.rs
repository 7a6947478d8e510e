use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by encoders, tokenizer probing and text framing.
pub enum EncodeError {
    #[error("invalid image: {reason}")]
    InvalidImage { reason: String },

    #[error("token sequence too long: {len} tokens (max {max})")]
    SequenceTooLong { len: usize, max: usize },

    #[error("unknown model family: {reason}")]
    UnknownFamily { reason: String },

    #[error("failed to load tokenizer from {path}: {reason}")]
    TokenizerLoadFailed { path: PathBuf, reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("encoder inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("encoder returned {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Convenience result type for encoder operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
