use std::fmt;

use thiserror::Error;

use crate::encoder::EncodeError;
use crate::repository::RepositoryError;

/// Which encoder an encode failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeInput {
    Image,
    Text,
}

impl fmt::Display for EncodeInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeInput::Image => f.write_str("image"),
            EncodeInput::Text => f.write_str("text"),
        }
    }
}

#[derive(Debug, Error)]
/// Errors returned by [`MatchEngine`](super::MatchEngine) operations.
pub enum MatchError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("{input} encoding failed: {source}")]
    EncodeFailed {
        input: EncodeInput,
        #[source]
        source: EncodeError,
    },

    #[error("query feature has {actual} values, repository stores {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("query feature component {index} is not finite")]
    NonFiniteFeature { index: usize },

    #[error("model setup failed: {0}")]
    ModelSetup(#[source] EncodeError),
}

impl MatchError {
    pub(crate) fn image(source: EncodeError) -> Self {
        MatchError::EncodeFailed {
            input: EncodeInput::Image,
            source,
        }
    }

    pub(crate) fn text(source: EncodeError) -> Self {
        MatchError::EncodeFailed {
            input: EncodeInput::Text,
            source,
        }
    }
}

/// Convenience result type for engine operations.
pub type EngineResult<T> = Result<T, MatchError>;
