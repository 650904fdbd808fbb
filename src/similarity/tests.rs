use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

fn phrases(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn image() -> Arc<[u8]> {
    Arc::from(&b"\x89PNG fake image bytes"[..])
}

mod summary_tests {
    use super::*;

    #[test]
    fn test_from_probabilities_picks_best_target() {
        let targets = phrases(&["a tumbler", "a mug"]);
        let result = SimilarityResult::from_probabilities(&[0.2, 0.6], &targets, 0.5);

        assert_eq!(result.max_score, 0.6);
        assert!((result.avg_score - 0.4).abs() < 1e-6);
        assert_eq!(result.best_phrase.as_deref(), Some("a mug"));
        assert!(result.passed);
        assert!(!result.is_failure());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let targets = phrases(&["a tumbler"]);
        let result = SimilarityResult::from_probabilities(&[0.5], &targets, 0.5);
        assert!(result.passed);

        let result = SimilarityResult::from_probabilities(&[0.49], &targets, 0.5);
        assert!(!result.passed);
    }

    #[test]
    fn test_scores_are_clamped() {
        let targets = phrases(&["x", "y"]);
        let result = SimilarityResult::from_probabilities(&[1.7, f32::NAN], &targets, 0.5);

        assert_eq!(result.max_score, 1.0);
        assert!((0.0..=1.0).contains(&result.avg_score));
    }

    #[test]
    fn test_failed_result_shape() {
        let result = SimilarityResult::failed(0.45, "boom");
        assert_eq!(result.max_score, 0.0);
        assert!(!result.passed);
        assert_eq!(result.threshold, 0.45);
        assert_eq!(result.failure.as_deref(), Some("boom"));
    }

    #[test]
    fn test_candidate_set_appends_new_contrasts_only() {
        let targets = phrases(&["a tumbler", "a tumbler", "a cup"]);
        let contrasts = phrases(&["a cup", "a cat"]);

        let (set, target_count) = candidate_set(&targets, &contrasts);
        assert_eq!(set, phrases(&["a tumbler", "a cup", "a cat"]));
        assert_eq!(target_count, 2);
    }
}

mod softmax_tests {
    use super::utils::softmax;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let a = softmax(&[1.0, 2.0]);
        let b = softmax(&[101.0, 102.0]);
        assert!((a[0] - b[0]).abs() < 1e-5);
    }

    #[test]
    fn test_softmax_edge_cases() {
        assert!(softmax(&[]).is_empty());
        assert_eq!(softmax(&[f32::NAN, f32::NAN]), vec![0.0, 0.0]);

        let probs = softmax(&[f32::NAN, 0.0]);
        assert_eq!(probs, vec![0.0, 1.0]);
    }
}

mod config_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stub_config_validates() {
        assert!(SimilarityConfig::stub().validate().is_ok());
    }

    #[test]
    fn test_missing_path_outside_stub_is_invalid() {
        let config = SimilarityConfig::default();
        assert!(matches!(
            config.validate(),
            Err(SimilarityError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_missing_weights_reported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();

        let config = SimilarityConfig::new(dir.path());
        match config.validate() {
            Err(SimilarityError::ModelNotFound { path }) => {
                assert!(path.ends_with(config::CLIP_WEIGHTS_FILE));
            }
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_complete_model_dir_validates() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tokenizer.json"), "{}").unwrap();
        std::fs::write(dir.path().join("model.safetensors"), b"").unwrap();

        assert!(SimilarityConfig::new(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = SimilarityConfig::stub().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_config_rejects_missing_model() {
        let result = SimilarityScorer::from_config(SimilarityConfig::new("/no/such/clip"));
        assert!(matches!(result, Err(SimilarityError::ModelNotFound { .. })));
    }
}

mod stub_tests {
    use super::*;

    #[test]
    fn test_stub_is_deterministic() {
        let scorer = ClipScorer::stub();
        let candidates = phrases(&["a tumbler", "a cat", "a bag"]);

        let a = scorer.embed_and_score(b"img", &candidates).unwrap();
        let b = scorer.embed_and_score(b"img", &candidates).unwrap();
        assert_eq!(a, b);

        let sum: f32 = a.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scorer.is_stub());
    }

    #[test]
    fn test_stub_depends_on_image() {
        let scorer = ClipScorer::stub();
        let candidates = phrases(&["a tumbler", "a cat", "a bag"]);

        let a = scorer.embed_and_score(b"img-1", &candidates).unwrap();
        let b = scorer.embed_and_score(b"img-2", &candidates).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_phrases_rejected() {
        let scorer = ClipScorer::stub();
        assert!(matches!(
            scorer.embed_and_score(b"img", &[]),
            Err(SimilarityError::NoCandidates)
        ));
    }
}

mod scorer_tests {
    use super::*;

    #[tokio::test]
    async fn test_score_uses_target_slice_only() {
        let model = Arc::new(MockSimilarityModel::with_top_score(0.82));
        let scorer = SimilarityScorer::with_model(model.clone(), Duration::from_secs(1));

        let result = scorer
            .score(
                image(),
                &phrases(&["a tumbler"]),
                &phrases(&["a cat", "a dog", "a tree", "a car"]),
                0.5,
            )
            .await;

        assert!((result.max_score - 0.82).abs() < 1e-6);
        assert_eq!(result.best_phrase.as_deref(), Some("a tumbler"));
        assert!(result.passed);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_low_score_fails_gate() {
        let model = Arc::new(MockSimilarityModel::with_top_score(0.2));
        let scorer = SimilarityScorer::with_model(model, Duration::from_secs(1));

        let result = scorer
            .score(image(), &phrases(&["a tumbler"]), &phrases(&["a cat"]), 0.5)
            .await;

        assert!((result.max_score - 0.2).abs() < 1e-6);
        assert!(!result.passed);
        assert!(!result.is_failure());
    }

    #[tokio::test]
    async fn test_model_error_is_captured() {
        let model = Arc::new(MockSimilarityModel::failing("bad image"));
        let scorer = SimilarityScorer::with_model(model, Duration::from_secs(1));

        let result = scorer
            .score(image(), &phrases(&["a tumbler"]), &[], 0.5)
            .await;

        assert_eq!(result.max_score, 0.0);
        assert!(!result.passed);
        assert!(result.failure.unwrap().contains("bad image"));
    }

    #[tokio::test]
    async fn test_timeout_is_captured() {
        let model =
            Arc::new(MockSimilarityModel::with_top_score(0.9).with_delay(Duration::from_millis(300)));
        let scorer = SimilarityScorer::with_model(model, Duration::from_millis(20));

        let result = scorer
            .score(image(), &phrases(&["a tumbler"]), &phrases(&["a cat"]), 0.5)
            .await;

        assert!(!result.passed);
        assert!(result.failure.unwrap().contains("exceeded"));
    }

    #[tokio::test]
    async fn test_no_targets_is_failure() {
        let scorer = SimilarityScorer::with_model(
            Arc::new(MockSimilarityModel::with_top_score(0.9)),
            Duration::from_secs(1),
        );

        let result = scorer.score(image(), &[], &phrases(&["a cat"]), 0.5).await;
        assert!(result.is_failure());
    }

    #[tokio::test]
    async fn test_stub_scorer_from_config() {
        let scorer = SimilarityScorer::from_config(SimilarityConfig::stub()).unwrap();
        assert!(scorer.is_loaded());
        assert_eq!(scorer.is_stub(), Some(true));
        assert_eq!(scorer.model_name().as_deref(), Some("clip-stub"));

        let a = scorer
            .score(image(), &phrases(&["a tumbler"]), &phrases(&["a cat"]), 0.0)
            .await;
        let b = scorer
            .score(image(), &phrases(&["a tumbler"]), &phrases(&["a cat"]), 0.0)
            .await;
        assert_eq!(a, b);
        assert!(a.passed);
    }
}

mod lazy_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);

        let lazy = LazyModel::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            Ok(Arc::new(MockSimilarityModel::with_top_score(0.7)) as Arc<dyn SimilarityModel>)
        });
        assert!(!lazy.is_loaded());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lazy = lazy.clone();
            handles.push(tokio::spawn(async move { lazy.get().await.map(|_| ()) }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(lazy.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_load_can_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);

        let lazy = LazyModel::new(move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SimilarityError::ModelLoadFailed {
                    reason: "first try".to_string(),
                })
            } else {
                Ok(Arc::new(MockSimilarityModel::with_top_score(0.7)) as Arc<dyn SimilarityModel>)
            }
        });

        assert!(lazy.get().await.is_err());
        assert!(!lazy.is_loaded());
        assert!(lazy.get().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_in_score() {
        let scorer = SimilarityScorer::new(
            LazyModel::new(|| {
                Err(SimilarityError::ModelLoadFailed {
                    reason: "weights corrupt".to_string(),
                })
            }),
            Duration::from_secs(1),
        );

        let result = scorer
            .score(image(), &phrases(&["a tumbler"]), &[], 0.5)
            .await;
        assert!(result.failure.unwrap().contains("weights corrupt"));
        assert_eq!(scorer.model_name(), None);
    }

    #[tokio::test]
    async fn test_slow_first_load_is_bounded_by_timeout() {
        let scorer = SimilarityScorer::new(
            LazyModel::new(|| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(Arc::new(MockSimilarityModel::with_top_score(0.9)) as Arc<dyn SimilarityModel>)
            }),
            Duration::from_millis(30),
        );

        let started = std::time::Instant::now();
        let result = scorer
            .score(image(), &phrases(&["a tumbler"]), &[], 0.5)
            .await;

        assert!(started.elapsed() < Duration::from_millis(400));
        assert!(!result.passed);
        assert_eq!(result.max_score, 0.0);
        assert!(result.failure.unwrap().contains("exceeded"));
    }
}

mod device_tests {
    use super::device::select_device;
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_device_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>(), Ok(DevicePreference::Auto));
        assert_eq!(" Cpu ".parse::<DevicePreference>(), Ok(DevicePreference::Cpu));
        assert_eq!("gpu".parse::<DevicePreference>(), Ok(DevicePreference::Auto));
        assert!("tpu".parse::<DevicePreference>().is_err());
        assert_eq!(DevicePreference::default(), DevicePreference::Auto);
        assert_eq!(DevicePreference::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_cpu_preference_skips_gpu_probe() {
        assert!(matches!(select_device(DevicePreference::Cpu), Device::Cpu));
    }

    #[cfg(not(any(feature = "metal", feature = "cuda")))]
    #[test]
    fn test_auto_without_gpu_backends_uses_cpu() {
        assert!(matches!(select_device(DevicePreference::Auto), Device::Cpu));
    }

    #[test]
    fn test_config_carries_device_preference() {
        let config = SimilarityConfig::stub().with_device(DevicePreference::Cpu);
        assert_eq!(config.device, DevicePreference::Cpu);

        let service = crate::config::Config {
            similarity_device: DevicePreference::Cpu,
            ..Default::default()
        };
        assert_eq!(SimilarityConfig::from_config(&service).device, DevicePreference::Cpu);
    }
}
