use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info};

use super::error::{EncodeError, EncodeResult};
use crate::scoring::ScoreTransform;

/// Dual-encoder architecture; fixes text framing and the score transform for a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    JinaClipV2,
    CnClip,
    Clip,
    Siglip2,
}

/// Read access to a tokenizer's special-token vocabulary.
pub trait SpecialTokens {
    /// Returns `true` if `token` is registered as a special token.
    fn is_special_token(&self, token: &str) -> bool;
}

impl SpecialTokens for tokenizers::Tokenizer {
    fn is_special_token(&self, token: &str) -> bool {
        self.get_added_tokens_decoder()
            .values()
            .any(|added| added.special && added.content == token)
    }
}

impl<T: AsRef<str>> SpecialTokens for [T] {
    fn is_special_token(&self, token: &str) -> bool {
        self.iter().any(|t| t.as_ref() == token)
    }
}

impl ModelFamily {
    /// Families in probing order.
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::JinaClipV2,
        ModelFamily::CnClip,
        ModelFamily::Clip,
        ModelFamily::Siglip2,
    ];

    /// Marker prepended to text before tokenization (empty when the family has none).
    pub fn begin_marker(self) -> &'static str {
        match self {
            ModelFamily::JinaClipV2 => "<s>",
            ModelFamily::CnClip => "[CLS]",
            ModelFamily::Clip => "<|startoftext|>",
            ModelFamily::Siglip2 => "",
        }
    }

    /// Marker appended to text before tokenization.
    pub fn end_marker(self) -> &'static str {
        match self {
            ModelFamily::JinaClipV2 => "</s>",
            ModelFamily::CnClip => "[SEP]",
            ModelFamily::Clip => "<|endoftext|>",
            ModelFamily::Siglip2 => "<eos>",
        }
    }

    /// Token id used to right-pad a sequence to the encoder's input length.
    pub fn pad_token_id(self) -> u32 {
        match self {
            ModelFamily::JinaClipV2 => 1,
            ModelFamily::CnClip | ModelFamily::Clip | ModelFamily::Siglip2 => 0,
        }
    }

    /// Score transform applied to text-to-image matches.
    pub fn score_transform(self) -> ScoreTransform {
        match self {
            ModelFamily::Siglip2 => ScoreTransform::siglip2(),
            ModelFamily::JinaClipV2 | ModelFamily::CnClip | ModelFamily::Clip => {
                ScoreTransform::clip()
            }
        }
    }

    /// Configuration name (`jina_clip_v2`, `cn_clip`, `clip`, `siglip2`).
    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::JinaClipV2 => "jina_clip_v2",
            ModelFamily::CnClip => "cn_clip",
            ModelFamily::Clip => "clip",
            ModelFamily::Siglip2 => "siglip2",
        }
    }

    /// Wraps `text` in the family's begin/end markers.
    pub fn frame(self, text: &str) -> String {
        let begin = self.begin_marker();
        let end = self.end_marker();
        let mut framed = String::with_capacity(begin.len() + text.len() + end.len());
        framed.push_str(begin);
        framed.push_str(text);
        framed.push_str(end);
        framed
    }

    /// Right-pads `ids` with the family pad id up to `len`.
    pub fn pad_token_ids(self, ids: &[u32], len: usize) -> EncodeResult<Vec<u32>> {
        if ids.len() > len {
            return Err(EncodeError::SequenceTooLong {
                len: ids.len(),
                max: len,
            });
        }

        let mut padded = Vec::with_capacity(len);
        padded.extend_from_slice(ids);
        padded.resize(len, self.pad_token_id());
        Ok(padded)
    }

    /// Returns `true` if the tokenizer registers this family's markers as special tokens.
    pub fn matches<T: SpecialTokens + ?Sized>(self, tokens: &T) -> bool {
        let begin = self.begin_marker();
        (begin.is_empty() || tokens.is_special_token(begin))
            && tokens.is_special_token(self.end_marker())
    }

    /// Probes families in order and returns the first whose markers the tokenizer knows.
    pub fn detect<T: SpecialTokens + ?Sized>(tokens: &T) -> EncodeResult<Self> {
        for family in Self::ALL {
            if family.matches(tokens) {
                debug!(family = family.as_str(), "Tokenizer markers matched");
                return Ok(family);
            }
        }

        Err(EncodeError::UnknownFamily {
            reason: "tokenizer has no recognised begin/end special tokens".to_string(),
        })
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelFamily {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|family| family.as_str() == normalized)
            .ok_or_else(|| EncodeError::UnknownFamily {
                reason: format!("'{}' (expected jina_clip_v2, cn_clip, clip or siglip2)", s),
            })
    }
}

/// Resolves the family once: explicit choice wins, otherwise the tokenizer is probed.
pub fn resolve_family(
    explicit: Option<ModelFamily>,
    tokenizer: Option<&tokenizers::Tokenizer>,
) -> EncodeResult<ModelFamily> {
    if let Some(family) = explicit {
        info!(family = family.as_str(), "Using configured model family");
        return Ok(family);
    }

    let tokenizer = tokenizer.ok_or_else(|| EncodeError::UnknownFamily {
        reason: "no family configured and no tokenizer to probe".to_string(),
    })?;

    let family = ModelFamily::detect(tokenizer)?;
    info!(family = family.as_str(), "Model family detected from tokenizer");
    Ok(family)
}
