use super::*;
use crate::encoder::{EncodeError, EncodeResult, StubEncoder, normalize};
use crate::storage::{MockLog, StorageError};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const DIM: usize = 4;

fn unit(values: &[f32]) -> Vec<f32> {
    let mut v = values.to_vec();
    normalize(&mut v);
    v
}

fn gray(fill: u8) -> ClipImage {
    ClipImage::new(vec![fill; 16], 4, 4, 1)
}

fn engine_with<E: Encoder>(
    encoder: E,
    family: ModelFamily,
) -> (MatchEngine<Arc<MockLog>, E>, Arc<MockLog>) {
    let log = Arc::new(MockLog::new());
    let repository = EmbeddingRepository::open(Arc::clone(&log), Some(DIM)).unwrap();
    let engine = MatchEngine::new(repository, encoder, family).unwrap();
    (engine, log)
}

fn stub_engine() -> (MatchEngine<Arc<MockLog>, StubEncoder>, Arc<MockLog>) {
    engine_with(StubEncoder::new(DIM), ModelFamily::Clip)
}

/// Encoder that always fails and counts how often it was called.
#[derive(Default)]
struct FailingEncoder {
    calls: AtomicUsize,
}

impl Encoder for FailingEncoder {
    fn encode_image(&self, _image: &ClipImage) -> EncodeResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EncodeError::InferenceFailed {
            reason: "accelerator unavailable".to_string(),
        })
    }

    fn encode_text(&self, _text: &str) -> EncodeResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EncodeError::InferenceFailed {
            reason: "accelerator unavailable".to_string(),
        })
    }

    fn image_feature_dim(&self) -> usize {
        DIM
    }

    fn text_feature_dim(&self) -> usize {
        DIM
    }
}

/// Encoder returning vectors of the wrong length.
struct ShortEncoder;

impl Encoder for ShortEncoder {
    fn encode_image(&self, _image: &ClipImage) -> EncodeResult<Vec<f32>> {
        Ok(vec![1.0])
    }

    fn encode_text(&self, _text: &str) -> EncodeResult<Vec<f32>> {
        Ok(vec![1.0])
    }

    fn image_feature_dim(&self) -> usize {
        DIM
    }

    fn text_feature_dim(&self) -> usize {
        DIM
    }
}

mod matching_tests {
    use super::*;

    #[test]
    fn test_match_by_feature_orders_by_similarity() {
        let (engine, _log) = stub_engine();
        let q = unit(&[1.0, 0.0, 0.0, 0.0]);
        engine.add_feature("a", &unit(&[0.9, 0.1, 0.0, 0.0]), false).unwrap();
        engine.add_feature("b", &unit(&[0.1, 0.9, 0.0, 0.0]), false).unwrap();

        let results = engine.match_by_feature(&q, 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].key, "a");
        assert_eq!(results[1].key, "b");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_match_by_feature_softmax_sums_to_one() {
        let (engine, _log) = stub_engine();
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            let mut v = vec![0.1; DIM];
            v[i] = 1.0;
            engine.add_feature(key, &unit(&v), false).unwrap();
        }

        let results = engine
            .match_by_feature(&unit(&[1.0, 0.5, 0.0, 0.0]), 10)
            .unwrap();
        let total: f32 = results.iter().map(|r| r.score).sum();
        assert_eq!(results.len(), 3);
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_match_by_feature_sigmoid_family() {
        let (engine, _log) = engine_with(StubEncoder::new(DIM), ModelFamily::Siglip2);
        let q = unit(&[1.0, 0.0, 0.0, 0.0]);
        engine.add_feature("same", &q, false).unwrap();
        engine.add_feature("other", &unit(&[0.0, 1.0, 0.0, 0.0]), false).unwrap();

        let results = engine.match_by_feature(&q, 2).unwrap();

        assert_eq!(engine.transform(), ScoreTransform::siglip2());
        assert_eq!(results[0].key, "same");
        let expected = crate::scoring::sigmoid(
            crate::constants::SIGLIP2_LOGIT_SCALE.exp() + crate::constants::SIGLIP2_LOGIT_BIAS,
        );
        assert!((results[0].score - expected).abs() < 1e-5);
    }

    #[test]
    fn test_match_by_text_finds_matching_feature() {
        let (engine, _log) = stub_engine();
        let text_feature = engine.get_text_feature("a red bicycle").unwrap();
        engine.add_feature("bicycle", &text_feature, false).unwrap();
        engine
            .add_feature("noise", &engine.get_text_feature("unrelated").unwrap(), false)
            .unwrap();

        let results = engine.match_by_text("a red bicycle", 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "bicycle");
    }

    #[test]
    fn test_match_by_image_uses_clamped_cosine() {
        let (engine, _log) = stub_engine();
        engine.add_image("img1", &gray(10), false).unwrap();
        engine.add_image("img2", &gray(200), false).unwrap();

        let results = engine.match_by_image(&gray(10), 2).unwrap();

        assert_eq!(results[0].key, "img1");
        assert!((results[0].score - 1.0).abs() < 1e-5);
        assert!(results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[test]
    fn test_empty_repository_returns_empty() {
        let (engine, _log) = stub_engine();
        assert!(engine.match_by_text("anything", 5).unwrap().is_empty());
        assert!(engine.match_by_image(&gray(1), 5).unwrap().is_empty());
    }

    #[test]
    fn test_top_k_zero_returns_empty() {
        let (engine, _log) = stub_engine();
        engine.add_feature("a", &unit(&[1.0; DIM]), false).unwrap();
        assert!(engine.match_by_feature(&unit(&[1.0; DIM]), 0).unwrap().is_empty());
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let (engine, _log) = stub_engine();
        engine.add_feature("a", &unit(&[1.0; DIM]), false).unwrap();

        let result = engine.match_by_feature(&[1.0, 0.0], 1);
        assert!(matches!(
            result,
            Err(MatchError::DimensionMismatch {
                expected: DIM,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_non_finite_features_rejected() {
        let (engine, log) = stub_engine();
        let good = unit(&[1.0, 0.0, 0.0, 0.0]);
        engine.add_feature("good", &good, false).unwrap();
        engine.add_feature("near", &unit(&[0.5, 0.5, 0.0, 0.0]), false).unwrap();

        let result = engine.add_feature("bad", &[0.0, f32::INFINITY, 0.0, 0.0], false);
        assert!(matches!(
            result,
            Err(MatchError::Repository(RepositoryError::NonFiniteFeature {
                index: 1
            }))
        ));
        assert!(!engine.contains("bad"));
        assert_eq!(log.len(), 2);

        let result = engine.match_by_feature(&[f32::NAN, 0.0, 0.0, 0.0], 2);
        assert!(matches!(
            result,
            Err(MatchError::NonFiniteFeature { index: 0 })
        ));
        let result = engine.match_by_image_feature(&[0.0, 0.0, f32::INFINITY, 0.0], 2);
        assert!(matches!(
            result,
            Err(MatchError::NonFiniteFeature { index: 2 })
        ));

        let results = engine.match_by_feature(&good, 2).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.score.is_finite()));
        let total: f32 = results.iter().map(|r| r.score).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_compare_batch_logits() {
        let (engine, _log) = stub_engine();
        let logits = engine
            .compare(&[gray(1), gray(2)], &["a cat", "a dog", "a car"])
            .unwrap();

        assert_eq!(logits.per_image.len(), 2);
        assert_eq!(logits.per_text.len(), 3);
        for row in &logits.per_image {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }
}

mod mutation_tests {
    use super::*;

    #[test]
    fn test_add_image_then_remove() {
        let (engine, log) = stub_engine();
        engine.add_image("img", &gray(5), false).unwrap();

        assert!(engine.contains("img"));
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.keys(), vec!["img".to_string()]);
        assert_eq!(log.len(), 1);
        assert_eq!(
            engine.get_feature("img"),
            Some(engine.get_image_feature(&gray(5)).unwrap())
        );

        engine.remove("img").unwrap();
        assert!(!engine.contains("img"));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_add_image_existing_key_skips_encoder() {
        let (engine, _log) = engine_with(FailingEncoder::default(), ModelFamily::Clip);
        engine.add_feature("taken", &unit(&[1.0; DIM]), false).unwrap();

        let result = engine.add_image("taken", &gray(1), false);

        assert!(matches!(
            result,
            Err(MatchError::Repository(RepositoryError::KeyExists { .. }))
        ));
        assert_eq!(engine.encoder().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_add_image_overwrite() {
        let (engine, _log) = stub_engine();
        engine.add_image("img", &gray(5), false).unwrap();
        engine.add_image("img", &gray(6), true).unwrap();

        assert_eq!(engine.len(), 1);
        assert_eq!(
            engine.get_feature("img"),
            Some(engine.get_image_feature(&gray(6)).unwrap())
        );
    }

    #[test]
    fn test_remove_missing_key() {
        let (engine, _log) = stub_engine();
        assert!(matches!(
            engine.remove("ghost"),
            Err(MatchError::Repository(RepositoryError::KeyNotFound { .. }))
        ));
    }

    #[test]
    fn test_contains_invalid_key_is_false() {
        let (engine, _log) = stub_engine();
        assert!(!engine.contains(""));
        assert!(!engine.contains(&"x".repeat(100)));
    }

    #[test]
    fn test_write_failure_surfaces_and_rolls_back() {
        let (engine, log) = stub_engine();
        log.set_fail_writes(true);

        let result = engine.add_image("img", &gray(5), false);

        assert!(matches!(
            result,
            Err(MatchError::Repository(RepositoryError::Storage(
                StorageError::WriteFailed { .. }
            )))
        ));
        assert!(!engine.contains("img"));
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_text_encode_failure_aborts() {
        let (engine, _log) = engine_with(FailingEncoder::default(), ModelFamily::Clip);
        engine.add_feature("a", &unit(&[1.0; DIM]), false).unwrap();

        let result = engine.match_by_text("query", 1);
        assert!(matches!(
            result,
            Err(MatchError::EncodeFailed {
                input: EncodeInput::Text,
                ..
            })
        ));
    }

    #[test]
    fn test_image_encode_failure_aborts() {
        let (engine, _log) = engine_with(FailingEncoder::default(), ModelFamily::Clip);

        let result = engine.match_by_image(&gray(1), 1);
        assert!(matches!(
            result,
            Err(MatchError::EncodeFailed {
                input: EncodeInput::Image,
                ..
            })
        ));
        assert!(result.unwrap_err().to_string().contains("image encoding failed"));
    }

    #[test]
    fn test_invalid_image_rejected_before_encoder() {
        let (engine, _log) = engine_with(FailingEncoder::default(), ModelFamily::Clip);
        let bad = ClipImage::new(vec![0; 4], 2, 2, 2);

        let result = engine.get_image_feature(&bad);
        assert!(matches!(
            result,
            Err(MatchError::EncodeFailed {
                source: EncodeError::InvalidImage { .. },
                ..
            })
        ));
        assert_eq!(engine.encoder().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_encoder_length_checked() {
        let (engine, _log) = engine_with(ShortEncoder, ModelFamily::Clip);
        assert!(matches!(
            engine.get_text_feature("x"),
            Err(MatchError::EncodeFailed {
                source: EncodeError::DimensionMismatch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_new_rejects_mismatched_repository() {
        let log = MockLog::new();
        log.insert_raw("a", crate::storage::encode_vector(&[1.0, 0.0]));
        let repository = EmbeddingRepository::open(log, None).unwrap();

        let result = MatchEngine::new(repository, StubEncoder::new(DIM), ModelFamily::Clip);
        assert!(matches!(
            result,
            Err(MatchError::DimensionMismatch { .. })
        ));
    }
}

mod open_tests {
    use super::*;

    #[test]
    fn test_open_with_explicit_family() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            db_path: dir.path().join("feat.redb"),
            model_family: Some(ModelFamily::CnClip),
            ..Default::default()
        };

        {
            let engine = MatchEngine::open(&config, StubEncoder::new(DIM)).unwrap();
            assert_eq!(engine.family(), ModelFamily::CnClip);
            engine.add_image("img", &gray(3), false).unwrap();
        }

        let engine = MatchEngine::open(&config, StubEncoder::new(DIM)).unwrap();
        assert!(engine.contains("img"));
        assert_eq!(engine.feature_dim(), DIM);
    }

    #[test]
    fn test_open_without_family_or_tokenizer_fails() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            db_path: dir.path().join("feat.redb"),
            ..Default::default()
        };

        assert!(matches!(
            MatchEngine::open(&config, StubEncoder::new(DIM)),
            Err(MatchError::ModelSetup(EncodeError::UnknownFamily { .. }))
        ));
    }

    #[test]
    fn test_open_rejects_encoder_dimension_change() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            db_path: dir.path().join("feat.redb"),
            model_family: Some(ModelFamily::Clip),
            ..Default::default()
        };

        {
            let engine = MatchEngine::open(&config, StubEncoder::new(DIM)).unwrap();
            engine.add_image("img", &gray(3), false).unwrap();
        }

        assert!(matches!(
            MatchEngine::open(&config, StubEncoder::new(8)),
            Err(MatchError::Repository(RepositoryError::CorruptRecord { .. }))
        ));
    }
}
