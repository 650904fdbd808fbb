//! Cross-cutting, shared constants.
//!
//! Every numeric knob below is a *default*. The live values flow through
//! [`FusionConfig`](crate::scoring::FusionConfig) and
//! [`ChallengeSpec`](crate::registry::ChallengeSpec) so they can be overridden
//! without code changes.

/// Weight of the cross-examination combined confidence.
pub const DEFAULT_WEIGHT_CROSS_CONFIDENCE: f32 = 0.35;
/// Weight of the affirmative/negative consistency score.
pub const DEFAULT_WEIGHT_CONSISTENCY: f32 = 0.25;
/// Weight of the image-text similarity score.
pub const DEFAULT_WEIGHT_SIMILARITY: f32 = 0.25;
/// Weight of the keyword term `1 - penalty`.
pub const DEFAULT_WEIGHT_KEYWORD: f32 = 0.15;

/// Fused confidence at or above which a submission is approved.
pub const DEFAULT_APPROVE_THRESHOLD: f32 = 0.8;
/// Fused confidence at or above which a submission is held for review.
pub const DEFAULT_REVIEW_THRESHOLD: f32 = 0.5;
/// Consistency score at or above which the two oracle judgments agree.
pub const DEFAULT_CONSISTENCY_THRESHOLD: f32 = 0.7;

/// Similarity gate used for challenge codes missing from the registry.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.5;
/// Keyword threshold used for challenge codes missing from the registry.
pub const DEFAULT_KEYWORD_MATCH_THRESHOLD: u32 = 1;

/// Penalty applied when fewer required keywords than the threshold are found.
pub const KEYWORD_SHORTFALL_PENALTY: f32 = 0.3;
/// Additional penalty applied when any forbidden keyword is found.
pub const FORBIDDEN_KEYWORD_PENALTY: f32 = 0.5;

/// Confidence reported when the forbidden-keyword veto fires.
pub const FORBIDDEN_VETO_CONFIDENCE: f32 = 0.1;

/// Confidence reported when every automated signal is unavailable.
pub const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Oracle defaults injected when a response cannot be parsed.
pub const DEFAULT_ORACLE_CONFIDENCE: f32 = 0.5;
pub const DEFAULT_UNRELATED_PROBABILITY: f32 = 0.5;

/// Tolerance used when checking that fusion weights sum to one.
pub const WEIGHT_SUM_TOLERANCE: f32 = 1e-6;

pub const DEFAULT_ORACLE_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ORACLE_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SIMILARITY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RESPONSE_LANGUAGE: &str = "ko";
pub const DEFAULT_DUPLICATE_CAPACITY: u64 = 100_000;

/// Clamps a score into `[0, 1]`, mapping non-finite values to `0.0`.
#[inline]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
