//! clipstore library crate (used by the server and integration tests).
//!
//! # Public API Surface
//!
//! ## Core Types
//! - [`EmbeddingRepository`] - durable keyed feature store mirrored in memory
//! - [`MatchEngine`] - encode, score and rank against the repository
//! - [`Config`], [`ConfigError`] - initialization record
//!
//! ## Scoring
//! - [`ScoreTransform`] - symmetric softmax / calibrated sigmoid policies
//! - [`cosine_similarity_clamped`] - raw image-to-image similarity
//! - [`select_top_k`], [`rank`] - bounded top-k selection
//!
//! ## Encoders
//! - [`Encoder`] - capability consumed by the engine
//! - [`ModelFamily`] - text framing and score policy per model family
//! - [`StubEncoder`] - deterministic encoder for tests and model-less runs
//!
//! ## Storage
//! - [`DurableLog`], [`RedbLog`] - ordered key-value log with atomic put/delete
//!
//! ## Test/Mock Support
//! [`MockLog`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod config;
pub mod constants;
pub mod encoder;
pub mod engine;
pub mod gateway;
pub mod repository;
pub mod scoring;
pub mod storage;

pub use config::{Config, ConfigError, Device};
pub use constants::{DimValidationError, validate_embedding_dim};
pub use encoder::{
    ClipImage, EncodeError, EncodeResult, Encoder, ModelFamily, StubEncoder, TextTokenizer,
};
pub use engine::{EncodeInput, EngineResult, MatchEngine, MatchError};
pub use repository::{
    EmbeddingRepository, RepositoryError, RepositoryResult, RepositorySnapshot, non_finite_index,
    validate_key,
};
pub use scoring::{
    LogitMatrices, MatchResult, ScoreTransform, ScoredIndex, cosine_similarity_clamped, rank,
    select_top_k,
};
#[cfg(any(test, feature = "mock"))]
pub use storage::MockLog;
pub use storage::{DurableLog, RedbLog, StorageError, StorageResult};
