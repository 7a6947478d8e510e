use tracing::debug;

use super::error::{EncodeError, EncodeResult};
use super::image::ClipImage;
use super::Encoder;
use super::tokenizer::TextTokenizer;

/// Deterministic encoder for tests and model-less runs.
///
/// Each input is hashed into a seed that drives an LCG; the resulting vector is
/// L2-normalized, so identical inputs always produce identical unit vectors.
///
/// With a [`TextTokenizer`] attached, text is framed and tokenized first and the padded id
/// sequence is hashed instead of the raw string, so texts that tokenize alike share a vector
/// and over-long text fails the same way a model-backed encoder would.
#[derive(Debug, Clone)]
pub struct StubEncoder {
    dim: usize,
    tokenizer: Option<TextTokenizer>,
}

impl StubEncoder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            tokenizer: None,
        }
    }

    /// Routes text through `tokenizer` before hashing.
    pub fn with_tokenizer(mut self, tokenizer: TextTokenizer) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    pub fn tokenizer(&self) -> Option<&TextTokenizer> {
        self.tokenizer.as_ref()
    }

    fn vector_from_seed(&self, seed: u64) -> Vec<f32> {
        let mut state = seed;
        let mut feature = Vec::with_capacity(self.dim);

        for _ in 0..self.dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            feature.push(value);
        }

        normalize(&mut feature);
        feature
    }
}

impl Encoder for StubEncoder {
    fn encode_image(&self, image: &ClipImage) -> EncodeResult<Vec<f32>> {
        image.validate()?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"image");
        hasher.update(&(image.width as u64).to_le_bytes());
        hasher.update(&(image.height as u64).to_le_bytes());
        hasher.update(&(image.channels as u64).to_le_bytes());
        for row in image.rows() {
            hasher.update(row);
        }

        debug!(
            width = image.width,
            height = image.height,
            channels = image.channels,
            "Generating stub image feature"
        );
        Ok(self.vector_from_seed(seed_from(hasher.finalize())))
    }

    fn encode_text(&self, text: &str) -> EncodeResult<Vec<f32>> {
        if self.dim == 0 {
            return Err(EncodeError::InferenceFailed {
                reason: "stub encoder configured with zero dimension".to_string(),
            });
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"text");
        match &self.tokenizer {
            Some(tokenizer) => {
                for id in tokenizer.token_ids(text)? {
                    hasher.update(&id.to_le_bytes());
                }
            }
            None => {
                hasher.update(text.as_bytes());
            }
        }

        debug!(
            text_len = text.len(),
            tokenized = self.tokenizer.is_some(),
            "Generating stub text feature"
        );
        Ok(self.vector_from_seed(seed_from(hasher.finalize())))
    }

    fn image_feature_dim(&self) -> usize {
        self.dim
    }

    fn text_feature_dim(&self) -> usize {
        self.dim
    }

    fn is_stub(&self) -> bool {
        true
    }
}

fn seed_from(hash: blake3::Hash) -> u64 {
    let bytes = hash.as_bytes();
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Scales `feature` to unit L2 norm in place (zero vectors are left unchanged).
pub fn normalize(feature: &mut [f32]) {
    let norm: f32 = feature.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm > 0.0 {
        for x in feature.iter_mut() {
            *x /= norm;
        }
    }
}
