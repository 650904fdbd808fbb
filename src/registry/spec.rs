use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use crate::constants::{DEFAULT_KEYWORD_MATCH_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD};

/// Language tags the generic spec populates keyword sets for.
pub const KNOWN_LANGUAGES: [&str; 2] = ["ko", "en"];

/// Title words that carry no information about the activity itself.
const GENERIC_TITLE_WORDS: [&str; 4] = ["challenge", "챌린지", "the", "and"];

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_keyword_match_threshold() -> u32 {
    DEFAULT_KEYWORD_MATCH_THRESHOLD
}

/// Verification recipe for one challenge type.
///
/// Immutable once the registry is built; shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeSpec {
    pub code: String,
    pub title: String,
    pub target_description: String,

    /// Candidate phrases handed to the similarity model.
    #[serde(default)]
    pub clip_phrases: Vec<String>,

    /// Language tag → ordered, de-duplicated keyword list.
    #[serde(default, alias = "required_keywords")]
    pub required_keywords_by_language: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub forbidden_keywords: Vec<String>,

    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    #[serde(default = "default_keyword_match_threshold")]
    pub keyword_match_threshold: u32,
}

impl ChallengeSpec {
    /// Builds the conservative spec used for codes missing from the registry.
    ///
    /// Keywords are the informative tokens of `title`; nothing is forbidden.
    pub fn generic(code: &str, title: &str) -> Self {
        let tokens = title_tokens(title);
        let target = title.trim().to_string();

        let required_keywords_by_language = KNOWN_LANGUAGES
            .iter()
            .map(|lang| (lang.to_string(), tokens.clone()))
            .collect();

        Self {
            code: code.to_string(),
            title: target.clone(),
            clip_phrases: vec![format!("a photo of {}", target)],
            target_description: target,
            required_keywords_by_language,
            forbidden_keywords: Vec::new(),
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            keyword_match_threshold: DEFAULT_KEYWORD_MATCH_THRESHOLD,
        }
    }

    /// Required keywords for `language`, or the union of every language when
    /// the spec has no list for it.
    pub fn required_keywords(&self, language: &str) -> Vec<&str> {
        if let Some(words) = self.required_keywords_by_language.get(language) {
            return words.iter().map(String::as_str).collect();
        }

        let mut union: Vec<&str> = Vec::new();
        for word in self.required_keywords_by_language.values().flatten() {
            if !union.contains(&word.as_str()) {
                union.push(word.as_str());
            }
        }
        union
    }

    /// Phrases describing the target, falling back to the target description.
    pub fn target_phrases(&self) -> Vec<String> {
        if self.clip_phrases.is_empty() {
            vec![format!("a photo of {}", self.target_description)]
        } else {
            self.clip_phrases.clone()
        }
    }

    /// Trims and de-duplicates keyword lists (keeping order), then checks thresholds.
    pub(crate) fn normalize(mut self) -> Result<Self, RegistryError> {
        if self.code.trim().is_empty() {
            return Err(RegistryError::InvalidSpec {
                code: self.code,
                reason: "code cannot be empty".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(RegistryError::InvalidSpec {
                code: self.code,
                reason: format!(
                    "similarity_threshold must be between 0.0 and 1.0, got {}",
                    self.similarity_threshold
                ),
            });
        }

        if self.keyword_match_threshold == 0 {
            return Err(RegistryError::InvalidSpec {
                code: self.code,
                reason: "keyword_match_threshold must be at least 1".to_string(),
            });
        }

        for words in self.required_keywords_by_language.values_mut() {
            *words = dedup_ordered(std::mem::take(words));
        }
        self.forbidden_keywords = dedup_ordered(std::mem::take(&mut self.forbidden_keywords));
        self.clip_phrases = dedup_ordered(std::mem::take(&mut self.clip_phrases));

        Ok(self)
    }
}

fn dedup_ordered(words: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    for word in words {
        let word = word.trim().to_string();
        if !word.is_empty() && !out.contains(&word) {
            out.push(word);
        }
    }
    out
}

/// Splits a challenge title into lowercase keyword tokens.
pub fn title_tokens(title: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();

    for raw in title.split(|c: char| !c.is_alphanumeric()) {
        let token = raw.to_lowercase();
        if token.chars().count() < 2 || GENERIC_TITLE_WORDS.contains(&token.as_str()) {
            continue;
        }
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }

    if tokens.is_empty() {
        let whole = title.trim().to_lowercase();
        if !whole.is_empty() {
            tokens.push(whole);
        }
    }

    tokens
}
