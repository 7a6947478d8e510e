//! Matching engine: encode, score every stored record, rank.
//!
//! Text queries use the family's [`ScoreTransform`]; image queries use the clamped raw
//! cosine path. Any encoder failure aborts the call; partial results are never returned.
//!
//! The repository sits behind a single `RwLock`: `add` / `remove` hold it exclusively for
//! the durable write and mirror update, queries hold it shared for the scan.

pub mod error;

#[cfg(test)]
mod tests;

use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::encoder::{
    ClipImage, Encoder, ModelFamily, check_feature_dim, load_tokenizer, resolve_family,
};
use crate::repository::{
    EmbeddingRepository, RepositoryError, RepositorySnapshot, non_finite_index, validate_key,
};
use crate::scoring::{
    LogitMatrices, MatchResult, ScoreTransform, cosine_similarity_clamped, rank,
};
use crate::storage::{DurableLog, RedbLog};

pub use error::{EncodeInput, EngineResult, MatchError};

/// Repository, encoder pair and model family bound together for one handle.
pub struct MatchEngine<L: DurableLog, E: Encoder> {
    repository: RwLock<EmbeddingRepository<L>>,
    encoder: E,
    family: ModelFamily,
    transform: ScoreTransform,
}

impl<L: DurableLog, E: Encoder> std::fmt::Debug for MatchEngine<L, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("family", &self.family)
            .field("transform", &self.transform)
            .field("records", &self.len())
            .field("stub_encoder", &self.encoder.is_stub())
            .finish()
    }
}

impl<E: Encoder> MatchEngine<RedbLog, E> {
    /// Opens the durable log from `config` and binds it to `encoder`.
    ///
    /// The family comes from `config.model_family`, or from probing the configured tokenizer.
    /// The repository is pinned to the encoder's image feature length.
    pub fn open(config: &Config, encoder: E) -> EngineResult<Self> {
        let tokenizer = match (&config.model_family, &config.tokenizer_path) {
            (None, Some(path)) => Some(load_tokenizer(path).map_err(MatchError::ModelSetup)?),
            _ => None,
        };
        let family = resolve_family(config.model_family, tokenizer.as_ref())
            .map_err(MatchError::ModelSetup)?;

        let log = RedbLog::open(&config.db_path).map_err(RepositoryError::from)?;
        let repository = EmbeddingRepository::open(log, Some(encoder.image_feature_dim()))?;

        Self::new(repository, encoder, family)
    }
}

impl<L: DurableLog, E: Encoder> MatchEngine<L, E> {
    /// Binds an opened repository to an encoder and family.
    ///
    /// Fails if the repository already holds vectors of a length the encoder does not produce.
    pub fn new(
        repository: EmbeddingRepository<L>,
        encoder: E,
        family: ModelFamily,
    ) -> EngineResult<Self> {
        if let Some(dim) = repository.dim() {
            let expected = encoder.image_feature_dim();
            if dim != expected {
                return Err(MatchError::DimensionMismatch {
                    expected,
                    actual: dim,
                });
            }
        }

        if encoder.is_stub() {
            warn!("Match engine running with STUB encoder (deterministic, not semantic)");
        }

        let transform = family.score_transform();
        info!(
            family = family.as_str(),
            ?transform,
            records = repository.len(),
            image_dim = encoder.image_feature_dim(),
            text_dim = encoder.text_feature_dim(),
            "Match engine ready"
        );

        Ok(Self {
            repository: RwLock::new(repository),
            encoder,
            family,
            transform,
        })
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn transform(&self) -> ScoreTransform {
        self.transform
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Feature length of stored vectors (the encoder's image length until something is stored).
    pub fn feature_dim(&self) -> usize {
        self.repository
            .read()
            .dim()
            .unwrap_or_else(|| self.encoder.image_feature_dim())
    }

    /// Encodes `image` and stores it under `key`.
    ///
    /// An existing key without `overwrite` is rejected before the encoder runs.
    pub fn add_image(&self, key: &str, image: &ClipImage, overwrite: bool) -> EngineResult<()> {
        validate_key(key)?;
        if !overwrite && self.contains(key) {
            return Err(RepositoryError::KeyExists {
                key: key.to_string(),
            }
            .into());
        }

        let feature = self.get_image_feature(image)?;
        self.add_feature(key, &feature, overwrite)
    }

    /// Stores a precomputed feature under `key`.
    pub fn add_feature(&self, key: &str, feature: &[f32], overwrite: bool) -> EngineResult<()> {
        self.repository.write().add(key, feature, overwrite)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> EngineResult<()> {
        self.repository.write().remove(key)?;
        Ok(())
    }

    /// Returns `true` if `key` is stored (`false` for malformed keys).
    pub fn contains(&self, key: &str) -> bool {
        self.repository.read().contains(key)
    }

    pub fn len(&self) -> usize {
        self.repository.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.repository.read().is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.repository.read().keys().to_vec()
    }

    /// Stored feature for `key`, if any.
    pub fn get_feature(&self, key: &str) -> Option<Vec<f32>> {
        self.repository.read().get(key).map(<[f32]>::to_vec)
    }

    /// Encodes `text` without ranking.
    pub fn get_text_feature(&self, text: &str) -> EngineResult<Vec<f32>> {
        let feature = self.encoder.encode_text(text).map_err(MatchError::text)?;
        check_feature_dim(&feature, self.encoder.text_feature_dim()).map_err(MatchError::text)?;
        Ok(feature)
    }

    /// Encodes `image` without ranking.
    pub fn get_image_feature(&self, image: &ClipImage) -> EngineResult<Vec<f32>> {
        image.validate().map_err(MatchError::image)?;
        let feature = self.encoder.encode_image(image).map_err(MatchError::image)?;
        check_feature_dim(&feature, self.encoder.image_feature_dim())
            .map_err(MatchError::image)?;
        Ok(feature)
    }

    /// Ranks stored images against `text` with the family's score transform.
    pub fn match_by_text(&self, text: &str, top_k: usize) -> EngineResult<Vec<MatchResult>> {
        let feature = self.get_text_feature(text)?;
        self.match_by_feature(&feature, top_k)
    }

    /// Ranks stored images against `image` by clamped cosine similarity.
    pub fn match_by_image(
        &self,
        image: &ClipImage,
        top_k: usize,
    ) -> EngineResult<Vec<MatchResult>> {
        let feature = self.get_image_feature(image)?;
        self.match_by_image_feature(&feature, top_k)
    }

    /// Ranks stored images against a precomputed text feature, skipping the encoder.
    pub fn match_by_feature(
        &self,
        feature: &[f32],
        top_k: usize,
    ) -> EngineResult<Vec<MatchResult>> {
        let transform = self.transform;
        self.rank_with("feature", feature, top_k, |snapshot| {
            transform.score_text_query(feature, snapshot.vectors())
        })
    }

    /// Ranks stored images against a precomputed image feature by clamped cosine.
    pub fn match_by_image_feature(
        &self,
        feature: &[f32],
        top_k: usize,
    ) -> EngineResult<Vec<MatchResult>> {
        self.rank_with("image_feature", feature, top_k, |snapshot| {
            snapshot
                .vectors()
                .map(|stored| cosine_similarity_clamped(feature, stored))
                .collect()
        })
    }

    /// Encodes both batches and returns the family's logit matrices.
    pub fn compare(&self, images: &[ClipImage], texts: &[&str]) -> EngineResult<LogitMatrices> {
        let image_features = images
            .iter()
            .map(|image| self.get_image_feature(image))
            .collect::<EngineResult<Vec<_>>>()?;
        let text_features = texts
            .iter()
            .map(|text| self.get_text_feature(text))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(self.transform.logits(&image_features, &text_features))
    }

    fn rank_with<F>(
        &self,
        query: &'static str,
        feature: &[f32],
        top_k: usize,
        score: F,
    ) -> EngineResult<Vec<MatchResult>>
    where
        F: FnOnce(RepositorySnapshot<'_>) -> Vec<f32>,
    {
        let started = Instant::now();
        let repository = self.repository.read();
        let snapshot = repository.snapshot();

        if snapshot.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if feature.len() != snapshot.dim() {
            return Err(MatchError::DimensionMismatch {
                expected: snapshot.dim(),
                actual: feature.len(),
            });
        }
        if let Some(index) = non_finite_index(feature) {
            return Err(MatchError::NonFiniteFeature { index });
        }

        let scores = score(snapshot);
        let results = rank(snapshot.keys(), &scores, top_k);

        debug!(
            query,
            candidates = snapshot.len(),
            top_k,
            returned = results.len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Match completed"
        );

        Ok(results)
    }
}
