use std::path::Path;

use tracing::debug;

use super::error::{EncodeError, EncodeResult};
use super::family::ModelFamily;
use crate::constants::DEFAULT_TEXT_TOKEN_LEN;

/// Loads a `tokenizer.json` file.
pub fn load_tokenizer(path: &Path) -> EncodeResult<tokenizers::Tokenizer> {
    if !path.exists() {
        return Err(EncodeError::TokenizerLoadFailed {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    tokenizers::Tokenizer::from_file(path).map_err(|e| EncodeError::TokenizerLoadFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Turns text into the fixed-length id sequence a text encoder consumes.
///
/// Text is framed with the family markers, tokenized without the tokenizer's own
/// post-processing and right-padded with the family pad id.
#[derive(Clone)]
pub struct TextTokenizer {
    tokenizer: tokenizers::Tokenizer,
    family: ModelFamily,
    max_len: usize,
}

impl std::fmt::Debug for TextTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextTokenizer")
            .field("family", &self.family)
            .field("max_len", &self.max_len)
            .finish()
    }
}

impl TextTokenizer {
    pub fn new(tokenizer: tokenizers::Tokenizer, family: ModelFamily) -> Self {
        Self {
            tokenizer,
            family,
            max_len: DEFAULT_TEXT_TOKEN_LEN,
        }
    }

    /// Overrides the padded sequence length.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn inner(&self) -> &tokenizers::Tokenizer {
        &self.tokenizer
    }

    /// Frames, tokenizes and pads `text`.
    pub fn token_ids(&self, text: &str) -> EncodeResult<Vec<u32>> {
        let framed = self.family.frame(text);
        let encoding =
            self.tokenizer
                .encode(framed, false)
                .map_err(|e| EncodeError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        debug!(
            tokens = encoding.get_ids().len(),
            max_len = self.max_len,
            "Text tokenized"
        );

        self.family.pad_token_ids(encoding.get_ids(), self.max_len)
    }
}
