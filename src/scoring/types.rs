use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::oracle::OracleJudgment;

/// Ternary verification verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    NeedsReview,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approved => "APPROVED",
            Decision::NeedsReview => "NEEDS_REVIEW",
            Decision::Rejected => "REJECTED",
        }
    }

    /// Lenient parse of an oracle-supplied label (`needs review`, `Needs-Review`, ...).
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        match normalized.as_str() {
            "APPROVED" | "APPROVE" => Some(Decision::Approved),
            "NEEDS_REVIEW" | "REVIEW" => Some(Decision::NeedsReview),
            "REJECTED" | "REJECT" => Some(Decision::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the cross-examination stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossExamResult {
    pub positive: OracleJudgment,
    pub negative: OracleJudgment,
    pub consistency_score: f32,
    pub is_consistent: bool,
    pub combined_confidence: f32,
}

/// Output of the keyword scan over an oracle rationale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordResult {
    /// Language the required keywords were taken from.
    pub language: String,
    pub matched_required: BTreeSet<String>,
    pub matched_forbidden: BTreeSet<String>,
    pub match_count: u32,
    pub keyword_score: f32,
    pub penalty: f32,
    pub passed: bool,
}

impl KeywordResult {
    pub fn has_forbidden(&self) -> bool {
        !self.matched_forbidden.is_empty()
    }
}

/// Fused confidence and the decision it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionOutcome {
    pub confidence: f32,
    pub decision: Decision,
}
