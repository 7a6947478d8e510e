use crate::constants::{CLIP_LOGIT_SCALE, SIGLIP2_LOGIT_BIAS, SIGLIP2_LOGIT_SCALE};

/// Policy mapping raw feature dot products to comparable scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreTransform {
    /// `softmax(scale * dot)`, normalized across the batch along each axis.
    Softmax { scale: f32 },
    /// `sigmoid(dot * exp(logit_scale) + logit_bias)`, independent per pair.
    Sigmoid { logit_scale: f32, logit_bias: f32 },
}

/// Both directions of a batch comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogitMatrices {
    /// `n x m`: each image's scores across all texts.
    pub per_image: Vec<Vec<f32>>,
    /// `m x n`: each text's scores across all images.
    pub per_text: Vec<Vec<f32>>,
}

impl ScoreTransform {
    /// Softmax with the contrastive scale of 100.
    pub const fn clip() -> Self {
        ScoreTransform::Softmax {
            scale: CLIP_LOGIT_SCALE,
        }
    }

    /// Sigmoid with the learned sigmoid-family constants.
    pub const fn siglip2() -> Self {
        ScoreTransform::Sigmoid {
            logit_scale: SIGLIP2_LOGIT_SCALE,
            logit_bias: SIGLIP2_LOGIT_BIAS,
        }
    }

    /// Returns `true` if scores are independent calibrated probabilities.
    pub fn is_calibrated(&self) -> bool {
        matches!(self, ScoreTransform::Sigmoid { .. })
    }

    /// Scores every image against every text.
    pub fn logits<I, T>(&self, images: &[I], texts: &[T]) -> LogitMatrices
    where
        I: AsRef<[f32]>,
        T: AsRef<[f32]>,
    {
        let raw: Vec<Vec<f32>> = images
            .iter()
            .map(|image| texts.iter().map(|text| dot(image.as_ref(), text.as_ref())).collect())
            .collect();
        let transposed: Vec<Vec<f32>> = (0..texts.len())
            .map(|j| raw.iter().map(|row| row[j]).collect())
            .collect();

        match *self {
            ScoreTransform::Softmax { scale } => LogitMatrices {
                per_image: raw.into_iter().map(|row| scaled_softmax(row, scale)).collect(),
                per_text: transposed
                    .into_iter()
                    .map(|row| scaled_softmax(row, scale))
                    .collect(),
            },
            ScoreTransform::Sigmoid {
                logit_scale,
                logit_bias,
            } => {
                let calibrate = |row: Vec<f32>| -> Vec<f32> {
                    row.into_iter()
                        .map(|d| calibrated(d, logit_scale, logit_bias))
                        .collect()
                };
                LogitMatrices {
                    per_image: raw.into_iter().map(calibrate).collect(),
                    per_text: transposed.into_iter().map(calibrate).collect(),
                }
            }
        }
    }

    /// Scores one text feature against every image feature.
    ///
    /// Equal to the single row of `logits(images, [text]).per_text`.
    pub fn score_text_query<'a, I>(&self, text: &[f32], images: I) -> Vec<f32>
    where
        I: IntoIterator<Item = &'a [f32]>,
    {
        let dots = images.into_iter().map(|image| dot(text, image));

        match *self {
            ScoreTransform::Softmax { scale } => scaled_softmax(dots.collect(), scale),
            ScoreTransform::Sigmoid {
                logit_scale,
                logit_bias,
            } => dots
                .map(|d| calibrated(d, logit_scale, logit_bias))
                .collect(),
        }
    }
}

impl Default for ScoreTransform {
    fn default() -> Self {
        Self::clip()
    }
}

/// Plain dot product over the common prefix of `a` and `b`.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Dot product of unit vectors, clamped to `[0, 1]`.
///
/// Mismatched lengths or empty input score 0.
pub fn cosine_similarity_clamped(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let similarity = dot(a, b);
    if similarity.is_nan() {
        return 0.0;
    }
    similarity.clamp(0.0, 1.0)
}

/// Logistic function.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Softmax with max-subtraction; the row sums to 1 for any finite input magnitude.
pub fn softmax_row(row: &mut [f32]) {
    if row.is_empty() {
        return;
    }

    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for value in row.iter_mut() {
        *value = (*value - max).exp();
        sum += *value;
    }

    if sum > 0.0 {
        for value in row.iter_mut() {
            *value /= sum;
        }
    }
}

fn scaled_softmax(mut row: Vec<f32>, scale: f32) -> Vec<f32> {
    for value in row.iter_mut() {
        *value *= scale;
    }
    softmax_row(&mut row);
    row
}

#[inline]
fn calibrated(dot: f32, logit_scale: f32, logit_bias: f32) -> f32 {
    sigmoid(dot * logit_scale.exp() + logit_bias)
}
