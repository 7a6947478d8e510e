//! Cross-cutting, shared constants.
//!
//! # Dimension Invariants
//!
//! The feature length `L` is fixed once per repository, when the encoder is loaded. The
//! constants below are defaults for stub encoders and static size calculations; use
//! [`validate_embedding_dim`] at module boundaries to catch mismatches early.

/// Upper bound on key length, including the terminator slot reserved by fixed-size result
/// records. Stored keys may therefore use at most `KEY_MAX_LEN - 1` bytes.
pub const KEY_MAX_LEN: usize = 64;

pub const DEFAULT_FEATURE_DIM: usize = 512;

/// Default number of results returned by a match call.
pub const DEFAULT_TOP_K: usize = 10;

/// Fixed logit scale applied before the symmetric softmax (contrastive models).
pub const CLIP_LOGIT_SCALE: f32 = 100.0;

/// Learned log-scale of the sigmoid-calibrated family (applied as `exp(scale)`).
pub const SIGLIP2_LOGIT_SCALE: f32 = 4.724_453_4;

/// Learned bias of the sigmoid-calibrated family.
pub const SIGLIP2_LOGIT_BIAS: f32 = -16.771_725;

/// Default number of text tokens fed to a text encoder.
pub const DEFAULT_TEXT_TOKEN_LEN: usize = 77;

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// # Example
///
/// ```
/// use clipstore::constants::{validate_embedding_dim, DEFAULT_FEATURE_DIM};
///
/// let encoder_dim = 512;
/// validate_embedding_dim(encoder_dim, DEFAULT_FEATURE_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if expected == 0 {
        return Err(DimValidationError::ZeroDimension);
    }
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
