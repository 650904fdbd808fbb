//! Typed view of the oracle's JSON replies.
//!
//! Parsing never fails: anything unreadable becomes [`OracleJudgment::fallback`].

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{DEFAULT_ORACLE_CONFIDENCE, DEFAULT_UNRELATED_PROBABILITY, clamp_unit};
use crate::scoring::Decision;

use super::prompts::PromptKind;

/// One oracle answer, after defaults were applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleJudgment {
    /// Verdict (affirmative stage; parsed but unused on the negative stage).
    pub result_kind: Option<Decision>,
    pub confidence: f32,
    /// Negative stage only.
    pub unrelated_probability: Option<f32>,
    pub explanation: String,
    /// Free text scanned for keywords.
    pub rationale: String,
    pub detected_items: Vec<String>,
    /// `false` when the reply could not be parsed and defaults were injected.
    pub parsed: bool,
}

impl OracleJudgment {
    /// Default judgment for unparsable replies.
    pub fn fallback() -> Self {
        Self {
            result_kind: Some(Decision::NeedsReview),
            confidence: DEFAULT_ORACLE_CONFIDENCE,
            unrelated_probability: Some(DEFAULT_UNRELATED_PROBABILITY),
            explanation: String::new(),
            rationale: String::new(),
            detected_items: Vec::new(),
            parsed: false,
        }
    }

    /// Parses a reply to an affirmative query.
    pub fn parse_affirmative(text: &str) -> Self {
        Self::parse(text, PromptKind::Affirmative)
    }

    /// Parses a reply to a negative query.
    pub fn parse_negative(text: &str) -> Self {
        Self::parse(text, PromptKind::Negative)
    }

    pub fn parse(text: &str, kind: PromptKind) -> Self {
        match parse_raw(text) {
            Some(raw) => raw.into_judgment(kind),
            None => {
                warn!(
                    ?kind,
                    response_len = text.len(),
                    "Oracle response was not valid JSON, using defaults"
                );
                Self::fallback()
            }
        }
    }

    /// `unrelated_probability`, or the documented default when absent.
    pub fn unrelated_or_default(&self) -> f32 {
        self.unrelated_probability
            .unwrap_or(DEFAULT_UNRELATED_PROBABILITY)
    }
}

/// Numbers sometimes arrive as strings ("0.9") or percentages ("90%", 90).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawScore {
    Number(f64),
    Text(String),
}

impl RawScore {
    fn value(&self) -> Option<f32> {
        let value = match self {
            RawScore::Number(n) => Some(percent_scale(*n as f32)),
            RawScore::Text(s) => {
                let s = s.trim();
                match s.strip_suffix('%') {
                    Some(pct) => pct.trim().parse::<f32>().ok().map(|v| v / 100.0),
                    None => s.parse::<f32>().ok().map(percent_scale),
                }
            }
        };
        value.filter(|v| v.is_finite()).map(clamp_unit)
    }
}

/// Bare scores in `(1, 100]` are read as percentages.
fn percent_scale(value: f32) -> f32 {
    if value > 1.0 && value <= 100.0 {
        value / 100.0
    } else {
        value
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawJudgment {
    #[serde(alias = "verification_result", alias = "result_kind")]
    result: Option<String>,
    confidence: Option<RawScore>,
    #[serde(alias = "unrelatedProbability")]
    unrelated_probability: Option<RawScore>,
    explanation: Option<String>,
    rationale: Option<String>,
    #[serde(alias = "detectedItems")]
    detected_items: Vec<String>,
}

impl RawJudgment {
    fn into_judgment(self, kind: PromptKind) -> OracleJudgment {
        let parsed_kind = self.result.as_deref().and_then(Decision::parse);
        let result_kind = match kind {
            PromptKind::Affirmative => Some(parsed_kind.unwrap_or(Decision::NeedsReview)),
            PromptKind::Negative => parsed_kind,
        };

        let confidence = self
            .confidence
            .as_ref()
            .and_then(RawScore::value)
            .unwrap_or(DEFAULT_ORACLE_CONFIDENCE);

        let unrelated = self.unrelated_probability.as_ref().and_then(RawScore::value);
        let unrelated_probability = match kind {
            PromptKind::Negative => Some(unrelated.unwrap_or(DEFAULT_UNRELATED_PROBABILITY)),
            PromptKind::Affirmative => unrelated,
        };

        let explanation = self.explanation.unwrap_or_default().trim().to_string();
        let detected_items: Vec<String> = self
            .detected_items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();

        let rationale = match self.rationale.map(|r| r.trim().to_string()) {
            Some(r) if !r.is_empty() => r,
            _ => compose_rationale(&explanation, &detected_items),
        };

        OracleJudgment {
            result_kind,
            confidence,
            unrelated_probability,
            explanation,
            rationale,
            detected_items,
            parsed: true,
        }
    }
}

fn compose_rationale(explanation: &str, detected_items: &[String]) -> String {
    if detected_items.is_empty() {
        explanation.to_string()
    } else if explanation.is_empty() {
        detected_items.join(", ")
    } else {
        format!("{} {}", explanation, detected_items.join(", "))
    }
}

/// Removes a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (`json`) up to the first newline.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn parse_raw(text: &str) -> Option<RawJudgment> {
    let body = strip_code_fence(text);

    if let Ok(raw) = serde_json::from_str::<RawJudgment>(body) {
        return Some(raw);
    }

    // Prose around the object: take the outermost braces.
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<RawJudgment>(&body[start..=end]).ok()
}
