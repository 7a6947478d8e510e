use serde::{Deserialize, Serialize};

use super::error::{EncodeError, EncodeResult};

/// Raw 8-bit image buffer handed to an image encoder.
///
/// Pixels are row-major and interleaved. `stride` is the byte distance between rows and
/// defaults to `width * channels`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipImage {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
}

impl ClipImage {
    /// Channel counts an encoder accepts (gray, RGB, RGBA).
    pub const SUPPORTED_CHANNELS: [usize; 3] = [1, 3, 4];

    /// Creates a tightly packed image.
    pub fn new(data: Vec<u8>, width: usize, height: usize, channels: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            stride: None,
        }
    }

    /// Byte distance between the starts of consecutive rows.
    pub fn row_stride(&self) -> usize {
        self.stride.unwrap_or(self.row_bytes())
    }

    /// Visible bytes per row, saturating on overflow (rejected by [`Self::validate`]).
    fn row_bytes(&self) -> usize {
        self.width.saturating_mul(self.channels)
    }

    /// Checks dimensions, channel count and that `data` covers every row.
    pub fn validate(&self) -> EncodeResult<()> {
        if self.data.is_empty() {
            return Err(invalid("pixel buffer is empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(invalid(format!(
                "dimensions must be non-zero (got {}x{})",
                self.width, self.height
            )));
        }
        if !Self::SUPPORTED_CHANNELS.contains(&self.channels) {
            return Err(invalid(format!(
                "unsupported channel count {} (expected 1, 3 or 4)",
                self.channels
            )));
        }

        let too_large = || {
            invalid(format!(
                "dimensions {}x{}x{} overflow the addressable size",
                self.width, self.height, self.channels
            ))
        };

        let row_bytes = self
            .width
            .checked_mul(self.channels)
            .ok_or_else(too_large)?;
        let stride = self.stride.unwrap_or(row_bytes);
        if stride < row_bytes {
            return Err(invalid(format!(
                "stride {} is smaller than row size {}",
                stride, row_bytes
            )));
        }

        let required = stride
            .checked_mul(self.height - 1)
            .and_then(|bytes| bytes.checked_add(row_bytes))
            .ok_or_else(too_large)?;
        if self.data.len() < required {
            return Err(invalid(format!(
                "pixel buffer holds {} bytes, {} required",
                self.data.len(),
                required
            )));
        }

        Ok(())
    }

    /// Iterates over the visible bytes of each row, skipping stride padding.
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.row_bytes();
        let stride = self.row_stride().max(1);
        self.data
            .chunks(stride)
            .take(self.height)
            .map(move |row| &row[..row_bytes.min(row.len())])
    }
}

fn invalid(reason: impl Into<String>) -> EncodeError {
    EncodeError::InvalidImage {
        reason: reason.into(),
    }
}
