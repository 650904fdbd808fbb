//! Challenge registry: challenge code → verification recipe.
//!
//! The built-in table ships as JSON next to this module and is parsed once at
//! startup. An operator-supplied file in the same format can add or replace
//! entries by code, so new challenge types need no code change.
//!
//! ```json
//! {
//!   "contrast_phrases": ["a screenshot of a web page"],
//!   "challenges": [
//!     {
//!       "code": "TUMBLER_CHALLENGE",
//!       "title": "텀블러 챌린지",
//!       "target_description": "a reusable tumbler",
//!       "clip_phrases": ["a photo of a reusable tumbler"],
//!       "required_keywords": { "ko": ["텀블러"], "en": ["tumbler"] },
//!       "forbidden_keywords": ["disposable"],
//!       "similarity_threshold": 0.5,
//!       "keyword_match_threshold": 1
//!     }
//!   ]
//! }
//! ```

pub mod error;
pub mod spec;

#[cfg(test)]
mod tests;

pub use error::RegistryError;
pub use spec::{ChallengeSpec, KNOWN_LANGUAGES, title_tokens};

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

const BUILTIN_TABLE: &str = include_str!("challenges.json");

#[derive(Debug, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    contrast_phrases: Vec<String>,
    #[serde(default)]
    challenges: Vec<ChallengeSpec>,
}

/// Read-only lookup table of challenge specs.
///
/// Safe to share across any number of concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct ChallengeRegistry {
    specs: HashMap<String, Arc<ChallengeSpec>>,
    contrast_phrases: Vec<String>,
}

impl ChallengeRegistry {
    /// Parses the table compiled into the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// Parses a registry document.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument = serde_json::from_str(json)?;

        let mut specs = HashMap::with_capacity(document.challenges.len());
        for spec in document.challenges {
            let spec = spec.normalize()?;
            if specs.contains_key(&spec.code) {
                return Err(RegistryError::DuplicateCode { code: spec.code });
            }
            specs.insert(spec.code.clone(), Arc::new(spec));
        }

        Ok(Self {
            specs,
            contrast_phrases: document
                .contrast_phrases
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }

    /// Reads and parses a registry document from disk.
    pub fn from_path(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Built-in table, optionally overlaid with an external file.
    pub fn load(overrides: Option<&Path>) -> Result<Self, RegistryError> {
        let builtin = Self::builtin()?;

        let registry = match overrides {
            Some(path) => {
                let external = Self::from_path(path)?;
                info!(
                    path = %path.display(),
                    entries = external.len(),
                    "Merging external challenge table"
                );
                builtin.merged_with(external)
            }
            None => builtin,
        };

        info!(
            challenges = registry.len(),
            contrast_phrases = registry.contrast_phrases.len(),
            "Challenge registry loaded"
        );

        Ok(registry)
    }

    /// Returns a registry where `other` adds or replaces entries by code.
    ///
    /// A non-empty contrast list in `other` replaces the current one.
    pub fn merged_with(mut self, other: Self) -> Self {
        for (code, spec) in other.specs {
            self.specs.insert(code, spec);
        }
        if !other.contrast_phrases.is_empty() {
            self.contrast_phrases = other.contrast_phrases;
        }
        self
    }

    /// Looks up a spec by code; unknown codes get a generic spec built from `title`.
    pub fn lookup(&self, code: &str, title: &str) -> Arc<ChallengeSpec> {
        match self.specs.get(code) {
            Some(spec) => Arc::clone(spec),
            None => {
                debug!(code, title, "Unknown challenge code, using generic spec");
                Arc::new(ChallengeSpec::generic(code, title))
            }
        }
    }

    /// Returns the spec registered under `code`, if any.
    pub fn get(&self, code: &str) -> Option<Arc<ChallengeSpec>> {
        self.specs.get(code).cloned()
    }

    /// Non-target phrases appended to every similarity candidate set.
    pub fn contrast_phrases(&self) -> &[String] {
        &self.contrast_phrases
    }

    /// All registered specs ordered by code.
    pub fn specs(&self) -> Vec<Arc<ChallengeSpec>> {
        let mut specs: Vec<_> = self.specs.values().cloned().collect();
        specs.sort_by(|a, b| a.code.cmp(&b.code));
        specs
    }

    pub fn contains(&self, code: &str) -> bool {
        self.specs.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
