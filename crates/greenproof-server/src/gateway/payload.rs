use axum::body::Bytes;
use axum::extract::Multipart;
use serde::Serialize;
use uuid::Uuid;

use greenproof::{Decision, Diagnostics, Finding, VerificationOutcome, VerificationState};

use super::error::GatewayError;

/// Fields of a `POST /verify` form after validation.
#[derive(Debug, Clone)]
pub struct VerifyForm {
    pub image: Bytes,
    pub challenge_code: String,
    pub challenge_title: String,
    pub member_id: Option<String>,
}

impl VerifyForm {
    /// Reads every field, accepting snake_case and camelCase names.
    ///
    /// Unknown fields are skipped. Nothing is verified until all required
    /// fields are present and non-empty.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, GatewayError> {
        let mut image = None;
        let mut challenge_code = None;
        let mut challenge_title = None;
        let mut member_id = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => image = Some(field.bytes().await?),
                "challenge_code" | "challengeCode" => challenge_code = Some(field.text().await?),
                "challenge_title" | "challengeTitle" => {
                    challenge_title = Some(field.text().await?)
                }
                "member_id" | "memberId" => member_id = Some(field.text().await?),
                _ => {}
            }
        }

        let image = image
            .filter(|bytes| !bytes.is_empty())
            .ok_or(GatewayError::MissingField("image"))?;
        let challenge_code =
            non_blank(challenge_code).ok_or(GatewayError::MissingField("challenge_code"))?;
        let challenge_title =
            non_blank(challenge_title).ok_or(GatewayError::MissingField("challenge_title"))?;

        Ok(Self {
            image,
            challenge_code,
            challenge_title,
            member_id: non_blank(member_id),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationDetails {
    pub gemini_confidence: Option<f32>,
    pub clip_similarity: Option<f32>,
    pub consistency_score: Option<f32>,
    pub keyword_match: Option<bool>,
    pub clip_passed: Option<bool>,
    pub self_check_consistent: Option<bool>,
    pub keyword_penalty: Option<f32>,
}

impl From<&Diagnostics> for VerificationDetails {
    fn from(d: &Diagnostics) -> Self {
        Self {
            gemini_confidence: d.gemini_confidence,
            clip_similarity: d.clip_similarity,
            consistency_score: d.consistency_score,
            keyword_match: d.keyword_match,
            clip_passed: d.clip_passed,
            self_check_consistent: d.self_check_consistent,
            keyword_penalty: d.keyword_penalty,
        }
    }
}

/// Body of a successful `POST /verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub verification_result: Decision,
    pub confidence: f32,
    pub explanation: String,
    pub detected_items: Vec<String>,
    pub verification_details: VerificationDetails,
    pub model: String,
    pub challenge_code: String,
    pub terminal_state: VerificationState,
    pub evidence: Vec<Finding>,
    pub image_digest: String,
    pub request_id: Uuid,
    pub verified_at: i64,
}

impl From<VerificationOutcome> for VerifyResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        Self {
            success: true,
            verification_result: outcome.decision,
            confidence: outcome.confidence,
            verification_details: VerificationDetails::from(&outcome.diagnostics),
            explanation: outcome.explanation,
            detected_items: outcome.detected_items,
            model: outcome.model,
            challenge_code: outcome.challenge_code,
            terminal_state: outcome.terminal_state,
            evidence: outcome.evidence,
            image_digest: outcome.image_digest,
            request_id: outcome.request_id,
            verified_at: outcome.verified_at,
        }
    }
}

/// One row of `GET /challenges`.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeSummary {
    pub code: String,
    pub title: String,
    pub similarity_threshold: f32,
    pub keyword_match_threshold: u32,
}
