use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::oracle::ImagePayload;
use crate::registry::ChallengeSpec;
use crate::scoring::Decision;

/// One verification call: the image, the recipe to check it against, and
/// optionally who submitted it.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub image: ImagePayload,
    pub spec: Arc<ChallengeSpec>,
    /// Enables the duplicate-submission check when set.
    pub member_id: Option<String>,
}

impl VerificationRequest {
    pub fn new(image: ImagePayload, spec: Arc<ChallengeSpec>) -> Self {
        Self {
            image,
            spec,
            member_id: None,
        }
    }

    pub fn with_member(mut self, member_id: impl Into<String>) -> Self {
        let member_id = member_id.into();
        self.member_id = (!member_id.trim().is_empty()).then_some(member_id);
        self
    }
}

/// Orchestrator states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    Start,
    DuplicateCheck,
    SimilarityGate,
    CrossExam,
    KeywordScan,
    Fuse,
    RejectedAsDuplicate,
    RejectedBySimilarity,
    RejectedByForbiddenKeyword,
    Fallback,
    Done,
}

impl VerificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationState::Start => "START",
            VerificationState::DuplicateCheck => "DUPLICATE_CHECK",
            VerificationState::SimilarityGate => "SIMILARITY_GATE",
            VerificationState::CrossExam => "CROSS_EXAM",
            VerificationState::KeywordScan => "KEYWORD_SCAN",
            VerificationState::Fuse => "FUSE",
            VerificationState::RejectedAsDuplicate => "REJECTED_AS_DUPLICATE",
            VerificationState::RejectedBySimilarity => "REJECTED_BY_SIMILARITY",
            VerificationState::RejectedByForbiddenKeyword => "REJECTED_BY_FORBIDDEN_KEYWORD",
            VerificationState::Fallback => "FALLBACK",
            VerificationState::Done => "DONE",
        }
    }
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged evidence item, in the order it was gathered.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    DuplicateImage {
        same_member: bool,
        other_members: usize,
    },
    Similarity {
        max_score: f32,
        avg_score: f32,
        best_phrase: Option<String>,
        threshold: f32,
        passed: bool,
    },
    SimilarityUnavailable {
        reason: String,
    },
    CrossExamination {
        positive_confidence: f32,
        unrelated_probability: f32,
        consistency_score: f32,
        is_consistent: bool,
        combined_confidence: f32,
    },
    /// The oracle reply could not be parsed and defaults were used.
    OracleDefaults {
        stage: &'static str,
    },
    OracleUnavailable {
        reason: String,
    },
    Keywords {
        language: String,
        matched_required: Vec<String>,
        match_count: u32,
        threshold: u32,
        penalty: f32,
    },
    ForbiddenKeywords {
        matched: Vec<String>,
    },
    Fused {
        confidence: f32,
        decision: Decision,
    },
    FallbackJudgment {
        result_kind: Option<Decision>,
        confidence: f32,
    },
}

/// Per-stage scores kept for audit and debugging.
///
/// Fields stay `None` for stages that did not run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub gemini_confidence: Option<f32>,
    pub clip_similarity: Option<f32>,
    pub consistency_score: Option<f32>,
    /// Whether the keyword scan passed.
    pub keyword_match: Option<bool>,
    pub clip_passed: Option<bool>,
    pub self_check_consistent: Option<bool>,
    pub keyword_penalty: Option<f32>,
    pub combined_confidence: Option<f32>,
    pub keyword_score: Option<f32>,
    pub clip_best_phrase: Option<String>,
}

/// Final verdict with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationOutcome {
    pub decision: Decision,
    pub confidence: f32,
    pub explanation: String,
    pub evidence: Vec<Finding>,
    pub diagnostics: Diagnostics,
    pub detected_items: Vec<String>,
    /// State that produced the decision.
    pub terminal_state: VerificationState,
    /// Every state visited, in order, ending with `DONE`.
    pub trace: Vec<VerificationState>,
    pub challenge_code: String,
    /// Models consulted, e.g. `gemini-2.0-flash+clip-vit-base-patch32`.
    pub model: String,
    /// BLAKE3 hex digest of the image.
    pub image_digest: String,
    pub request_id: Uuid,
    /// Unix seconds.
    pub verified_at: i64,
}

impl VerificationOutcome {
    pub fn visited(&self, state: VerificationState) -> bool {
        self.trace.contains(&state)
    }
}
