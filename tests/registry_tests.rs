//! Challenge table loading and overlay through engine configuration.

mod common;

use std::io::Write;

use greenproof::{
    ChallengeRegistry, Config, Decision, FusionConfig, MockOracle, MockSimilarityModel,
    VerificationError, VerificationOrchestrator,
};

use common::pipeline;

const OVERLAY: &str = r#"{
  "challenges": [
    {
      "code": "BIKE_COMMUTE",
      "title": "자전거 출퇴근 챌린지",
      "target_description": "a person commuting by bicycle",
      "clip_phrases": ["a photo of a person riding a bicycle on a city street"],
      "required_keywords": {
        "ko": ["자전거"],
        "en": ["bicycle", "bike"]
      },
      "forbidden_keywords": ["car", "자동차"],
      "similarity_threshold": 0.4,
      "keyword_match_threshold": 1
    }
  ]
}"#;

fn overlay_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(OVERLAY.as_bytes()).unwrap();
    file
}

fn mock_config() -> Config {
    Config {
        similarity_stub: true,
        oracle_model: "mock:approve".to_string(),
        ..Config::default()
    }
}

#[test]
fn test_overlay_adds_challenges_and_keeps_builtin() {
    let file = overlay_file();
    let builtin = ChallengeRegistry::builtin().unwrap();

    let merged = ChallengeRegistry::load(Some(file.path())).unwrap();

    assert_eq!(merged.len(), builtin.len() + 1);
    assert!(merged.contains("TUMBLER_CHALLENGE"));
    let bike = merged.get("BIKE_COMMUTE").unwrap();
    assert_eq!(bike.similarity_threshold, 0.4);
    assert_eq!(merged.contrast_phrases(), builtin.contrast_phrases());
}

#[test]
fn test_engine_loads_overlay_from_config() {
    let file = overlay_file();
    let config = Config {
        registry_path: Some(file.path().to_path_buf()),
        ..mock_config()
    };

    let orchestrator = VerificationOrchestrator::from_config(&config, FusionConfig::default()).unwrap();

    assert!(orchestrator.registry().contains("BIKE_COMMUTE"));
    assert_eq!(orchestrator.status().challenges, orchestrator.registry().len());
}

#[test]
fn test_malformed_overlay_fails_startup() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();
    let config = Config {
        registry_path: Some(file.path().to_path_buf()),
        ..mock_config()
    };

    let err = VerificationOrchestrator::from_config(&config, FusionConfig::default()).unwrap_err();
    assert!(matches!(err, VerificationError::Registry(_)));
}

#[test]
fn test_missing_overlay_fails_startup() {
    let config = Config {
        registry_path: Some("/definitely/not/here.json".into()),
        ..mock_config()
    };

    let err = VerificationOrchestrator::from_config(&config, FusionConfig::default()).unwrap_err();
    assert!(matches!(err, VerificationError::Config(_)));
}

#[tokio::test]
async fn test_generic_spec_uses_title_keywords() {
    let p = pipeline(MockSimilarityModel::with_top_score(0.82), MockOracle::approving());
    let spec = p.orchestrator.lookup("TUMBLER_NEW_2026", "tumbler week");

    assert!(!p.orchestrator.registry().contains("TUMBLER_NEW_2026"));
    assert!(spec.forbidden_keywords.is_empty());

    let outcome = p
        .orchestrator
        .verify(greenproof::VerificationRequest::new(
            greenproof::ImagePayload::new(common::TEST_IMAGE.to_vec()),
            spec,
        ))
        .await;

    // "tumbler" in the title matches the approving rationale
    assert_eq!(outcome.diagnostics.keyword_match, Some(true));
    assert_eq!(outcome.decision, Decision::Approved);
}
