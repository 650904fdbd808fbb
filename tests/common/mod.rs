//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use greenproof::{
    ChallengeRegistry, CrossExaminationEngine, FusionEngine, ImagePayload, MockOracle,
    MockSimilarityModel, SimilarityScorer, VerificationOrchestrator, VerificationRequest,
};

pub const TEST_IMAGE: &[u8] = b"\x89PNG\r\n\x1a\n not a real png";

pub struct Pipeline {
    pub orchestrator: VerificationOrchestrator,
    pub oracle: Arc<MockOracle>,
    pub similarity: Arc<MockSimilarityModel>,
}

impl Pipeline {
    pub fn request(&self, code: &str) -> VerificationRequest {
        let spec = self.orchestrator.lookup(code, "");
        VerificationRequest::new(ImagePayload::new(TEST_IMAGE.to_vec()), spec)
    }
}

/// Orchestrator over the built-in registry with scripted models.
pub fn pipeline(similarity: MockSimilarityModel, oracle: MockOracle) -> Pipeline {
    let registry = Arc::new(ChallengeRegistry::builtin().expect("builtin registry parses"));
    let similarity = Arc::new(similarity);
    let oracle = Arc::new(oracle);

    let scorer = SimilarityScorer::with_model(similarity.clone(), Duration::from_secs(5));
    let cross_exam =
        CrossExaminationEngine::new(oracle.clone()).with_timeout(Duration::from_secs(5));

    Pipeline {
        orchestrator: VerificationOrchestrator::new(
            registry,
            scorer,
            cross_exam,
            FusionEngine::default(),
        ),
        oracle,
        similarity,
    }
}

/// Affirmative reply with the given verdict, confidence and rationale.
pub fn affirmative(result: &str, confidence: f32, rationale: &str) -> String {
    serde_json::json!({
        "verification_result": result,
        "confidence": confidence,
        "explanation": rationale,
        "rationale": rationale,
        "detected_items": [],
    })
    .to_string()
}

pub fn negative(unrelated: f32) -> String {
    serde_json::json!({ "unrelated_probability": unrelated }).to_string()
}
