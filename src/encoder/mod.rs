//! Encoder capability and model-family handling.
//!
//! - [`Encoder`] is the seam to the image/text encoders; implementations must return
//!   L2-normalized vectors. Nothing downstream re-normalizes.
//! - [`ModelFamily`] fixes text framing and the score transform for a handle.
//! - [`TextTokenizer`] frames, tokenizes and pads text for a family; [`StubEncoder`] and
//!   model-backed encoders feed text through it.
//! - [`StubEncoder`] produces deterministic vectors without model files.

mod error;
/// Model family table, probing and text framing.
pub mod family;
/// Raw image buffers.
pub mod image;
/// Deterministic stub encoder.
pub mod stub;
/// Tokenizer loading and id-sequence preparation.
pub mod tokenizer;


use std::sync::Arc;

pub use error::{EncodeError, EncodeResult};
pub use family::{ModelFamily, SpecialTokens, resolve_family};
pub use image::ClipImage;
pub use stub::{StubEncoder, normalize};
pub use tokenizer::{TextTokenizer, load_tokenizer};

/// Image and text encoder pair.
pub trait Encoder: Send + Sync {
    /// Encodes an image into a unit vector of [`Self::image_feature_dim`] values.
    fn encode_image(&self, image: &ClipImage) -> EncodeResult<Vec<f32>>;

    /// Encodes text into a unit vector of [`Self::text_feature_dim`] values.
    fn encode_text(&self, text: &str) -> EncodeResult<Vec<f32>>;

    fn image_feature_dim(&self) -> usize;

    fn text_feature_dim(&self) -> usize;

    /// Returns `true` for encoders that do not run a real model.
    fn is_stub(&self) -> bool {
        false
    }
}

impl<E: Encoder + ?Sized> Encoder for Arc<E> {
    fn encode_image(&self, image: &ClipImage) -> EncodeResult<Vec<f32>> {
        (**self).encode_image(image)
    }

    fn encode_text(&self, text: &str) -> EncodeResult<Vec<f32>> {
        (**self).encode_text(text)
    }

    fn image_feature_dim(&self) -> usize {
        (**self).image_feature_dim()
    }

    fn text_feature_dim(&self) -> usize {
        (**self).text_feature_dim()
    }

    fn is_stub(&self) -> bool {
        (**self).is_stub()
    }
}

/// Checks an encoder output against the expected feature length.
pub fn check_feature_dim(feature: &[f32], expected: usize) -> EncodeResult<()> {
    if feature.len() != expected {
        return Err(EncodeError::DimensionMismatch {
            expected,
            actual: feature.len(),
        });
    }
    Ok(())
}
