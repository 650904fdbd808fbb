use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::constants::{DEFAULT_CONSISTENCY_THRESHOLD, DEFAULT_ORACLE_TIMEOUT_MS, clamp_unit};
use crate::oracle::{
    ImagePayload, OracleError, OracleJudgment, VisionOracle, affirmative_prompt,
    ask_with_timeout, negative_prompt,
};
use crate::registry::ChallengeSpec;

use super::types::CrossExamResult;

/// Agreement between the two judgments: `1 - |(1 - confidence) - unrelated|`.
pub fn consistency_score(positive_confidence: f32, unrelated_probability: f32) -> f32 {
    let expected_negative = 1.0 - clamp_unit(positive_confidence);
    let actual_negative = clamp_unit(unrelated_probability);
    clamp_unit(1.0 - (expected_negative - actual_negative).abs())
}

/// Mean of the positive confidence and `1 - unrelated`.
pub fn combined_confidence(positive_confidence: f32, unrelated_probability: f32) -> f32 {
    clamp_unit((clamp_unit(positive_confidence) + (1.0 - clamp_unit(unrelated_probability))) / 2.0)
}

impl CrossExamResult {
    /// Derives the consistency fields from a pair of judgments.
    pub fn from_judgments(
        positive: OracleJudgment,
        negative: OracleJudgment,
        consistency_threshold: f32,
    ) -> Self {
        let unrelated = negative.unrelated_or_default();
        let consistency_score = consistency_score(positive.confidence, unrelated);
        let combined_confidence = combined_confidence(positive.confidence, unrelated);

        Self {
            positive,
            negative,
            consistency_score,
            is_consistent: consistency_score >= consistency_threshold,
            combined_confidence,
        }
    }
}

/// Asks the oracle the same question twice, framed affirmatively and negatively.
#[derive(Clone)]
pub struct CrossExaminationEngine {
    oracle: Arc<dyn VisionOracle>,
    timeout: Duration,
    consistency_threshold: f32,
    response_language: String,
}

impl std::fmt::Debug for CrossExaminationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossExaminationEngine")
            .field("oracle", &self.oracle.model_name())
            .field("timeout", &self.timeout)
            .field("consistency_threshold", &self.consistency_threshold)
            .field("response_language", &self.response_language)
            .finish()
    }
}

impl CrossExaminationEngine {
    pub fn new(oracle: Arc<dyn VisionOracle>) -> Self {
        Self {
            oracle,
            timeout: Duration::from_millis(DEFAULT_ORACLE_TIMEOUT_MS),
            consistency_threshold: DEFAULT_CONSISTENCY_THRESHOLD,
            response_language: crate::constants::DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_consistency_threshold(mut self, threshold: f32) -> Self {
        self.consistency_threshold = threshold;
        self
    }

    pub fn with_response_language(mut self, language: impl Into<String>) -> Self {
        self.response_language = language.into();
        self
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.model_name()
    }

    /// Runs both queries concurrently and joins them.
    ///
    /// Either call failing (including timeouts) fails the whole stage.
    pub async fn examine(
        &self,
        image: &ImagePayload,
        spec: &ChallengeSpec,
    ) -> Result<CrossExamResult, OracleError> {
        let affirmative = affirmative_prompt(spec, &self.response_language);
        let negative = negative_prompt(spec, &self.response_language);

        let (positive_reply, negative_reply) = tokio::join!(
            ask_with_timeout(self.oracle.as_ref(), image, &affirmative, self.timeout),
            ask_with_timeout(self.oracle.as_ref(), image, &negative, self.timeout),
        );

        let positive_reply = positive_reply.inspect_err(|e| {
            warn!(code = %spec.code, error = %e, "Affirmative oracle query failed");
        })?;
        let negative_reply = negative_reply.inspect_err(|e| {
            warn!(code = %spec.code, error = %e, "Negative oracle query failed");
        })?;

        let positive = OracleJudgment::parse_affirmative(&positive_reply);
        let negative = OracleJudgment::parse_negative(&negative_reply);
        let result = CrossExamResult::from_judgments(positive, negative, self.consistency_threshold);

        debug!(
            code = %spec.code,
            positive_confidence = result.positive.confidence,
            unrelated_probability = ?result.negative.unrelated_probability,
            consistency = result.consistency_score,
            consistent = result.is_consistent,
            combined = result.combined_confidence,
            "Cross-examination complete"
        );

        Ok(result)
    }

    /// Affirmative query alone (reduced verification path).
    pub async fn affirm_only(
        &self,
        image: &ImagePayload,
        spec: &ChallengeSpec,
    ) -> Result<OracleJudgment, OracleError> {
        let instruction = affirmative_prompt(spec, &self.response_language);
        let reply = ask_with_timeout(self.oracle.as_ref(), image, &instruction, self.timeout).await?;
        Ok(OracleJudgment::parse_affirmative(&reply))
    }
}
