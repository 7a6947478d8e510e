//! Score transforms and top-k ranking.
//!
//! - [`ScoreTransform`] turns feature dot products into comparable scores, either by a
//!   symmetric batch softmax (contrastive families) or an independent sigmoid with a learned
//!   scale and bias.
//! - [`cosine_similarity_clamped`] is the uncalibrated image-to-image path.
//! - [`select_top_k`] / [`rank`] reduce a score row to an ordered result list.

pub mod topk;
pub mod transform;
pub mod types;


pub use topk::{ScoredIndex, rank, select_top_k};
pub use transform::{
    LogitMatrices, ScoreTransform, cosine_similarity_clamped, dot, sigmoid, softmax_row,
};
pub use types::MatchResult;
