use std::collections::BTreeSet;

use tracing::debug;

use crate::constants::{FORBIDDEN_KEYWORD_PENALTY, KEYWORD_SHORTFALL_PENALTY, clamp_unit};
use crate::registry::ChallengeSpec;

use super::types::KeywordResult;

/// Guesses the language tag of `text`: `ko` if any Hangul appears, else `en`.
pub fn detect_language(text: &str) -> &'static str {
    let hangul = text.chars().any(|c| {
        matches!(c,
            '\u{AC00}'..='\u{D7A3}'   // syllables
            | '\u{1100}'..='\u{11FF}' // jamo
            | '\u{3130}'..='\u{318F}' // compatibility jamo
        )
    });
    if hangul { "ko" } else { "en" }
}

/// Scans oracle rationales for required and forbidden terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordValidator;

impl KeywordValidator {
    pub fn new() -> Self {
        Self
    }

    /// Case-insensitive substring scan of `rationale` against `spec`'s keyword sets.
    pub fn validate(&self, rationale: &str, spec: &ChallengeSpec) -> KeywordResult {
        let haystack = rationale.to_lowercase();
        let language = detect_language(rationale);

        let matched_required: BTreeSet<String> = spec
            .required_keywords(language)
            .into_iter()
            .filter(|k| haystack.contains(&k.to_lowercase()))
            .map(str::to_string)
            .collect();

        let matched_forbidden: BTreeSet<String> = spec
            .forbidden_keywords
            .iter()
            .filter(|k| haystack.contains(&k.to_lowercase()))
            .cloned()
            .collect();

        let threshold = spec.keyword_match_threshold.max(1);
        let match_count = matched_required.len() as u32;
        let keyword_score = clamp_unit(match_count as f32 / threshold as f32);

        let mut penalty = 0.0;
        if match_count < threshold {
            penalty += KEYWORD_SHORTFALL_PENALTY;
        }
        if !matched_forbidden.is_empty() {
            penalty += FORBIDDEN_KEYWORD_PENALTY;
        }

        let passed = match_count >= threshold && matched_forbidden.is_empty();

        debug!(
            code = %spec.code,
            language,
            match_count,
            threshold,
            forbidden = matched_forbidden.len(),
            penalty,
            passed,
            "Keyword scan complete"
        );

        KeywordResult {
            language: language.to_string(),
            matched_required,
            matched_forbidden,
            match_count,
            keyword_score,
            penalty,
            passed,
        }
    }
}
