//! Image-text similarity stage.
//!
//! - [`clip`] provides the CLIP-backed [`SimilarityModel`] (with a stub mode).
//! - [`SimilarityScorer`] scores an image against candidate phrases and never
//!   fails: model errors come back as a failed [`SimilarityResult`].
//!
//! Probabilities are a softmax over the candidate set, so a score says which
//! phrase fits best, not how well it fits in absolute terms.

/// CLIP scorer.
pub mod clip;
/// Similarity configuration.
pub mod config;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
/// One-time model initialisation.
pub mod lazy;
/// Tokenizer loading and softmax helpers.
pub mod utils;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use clip::ClipScorer;
pub use config::SimilarityConfig;
pub use device::DevicePreference;
pub use error::SimilarityError;
pub use lazy::LazyModel;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockSimilarityModel;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::clamp_unit;

/// Collaborator boundary: probability per phrase for one image.
///
/// Implementations must be deterministic for a fixed model and input.
pub trait SimilarityModel: Send + Sync {
    fn embed_and_score(&self, image: &[u8], phrases: &[String]) -> Result<Vec<f32>, SimilarityError>;

    /// Short label for logs and the API `model` field.
    fn name(&self) -> &str;

    fn is_stub(&self) -> bool {
        false
    }
}

/// Outcome of the similarity stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityResult {
    pub max_score: f32,
    pub avg_score: f32,
    pub best_phrase: Option<String>,
    pub threshold: f32,
    pub passed: bool,
    /// Set when the model could not produce scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl SimilarityResult {
    /// Result reported when scoring could not run.
    pub fn failed(threshold: f32, reason: impl Into<String>) -> Self {
        Self {
            max_score: 0.0,
            avg_score: 0.0,
            best_phrase: None,
            threshold,
            passed: false,
            failure: Some(reason.into()),
        }
    }

    /// Summarises probabilities for `targets`, the leading entries of the candidate set.
    pub fn from_probabilities(probabilities: &[f32], targets: &[String], threshold: f32) -> Self {
        let scored = probabilities.iter().zip(targets.iter());

        let mut best: Option<(f32, &String)> = None;
        let mut sum = 0.0f32;
        let mut count = 0usize;
        for (&p, phrase) in scored {
            let p = clamp_unit(p);
            sum += p;
            count += 1;
            if best.is_none_or(|(top, _)| p > top) {
                best = Some((p, phrase));
            }
        }

        let max_score = best.map(|(p, _)| p).unwrap_or(0.0);
        let avg_score = if count == 0 {
            0.0
        } else {
            clamp_unit(sum / count as f32)
        };

        Self {
            max_score,
            avg_score,
            best_phrase: best.map(|(_, phrase)| phrase.clone()),
            threshold,
            passed: max_score >= threshold,
            failure: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// Target phrases followed by the contrast phrases that are not already targets.
pub fn candidate_set(targets: &[String], contrasts: &[String]) -> (Vec<String>, usize) {
    let mut phrases: Vec<String> = Vec::with_capacity(targets.len() + contrasts.len());
    for phrase in targets {
        if !phrases.contains(phrase) {
            phrases.push(phrase.clone());
        }
    }
    let target_count = phrases.len();
    for phrase in contrasts {
        if !phrases.contains(phrase) {
            phrases.push(phrase.clone());
        }
    }
    (phrases, target_count)
}

/// Runs the similarity model off the async runtime, bounded by a timeout.
#[derive(Clone)]
pub struct SimilarityScorer {
    model: LazyModel,
    timeout: Duration,
}

impl std::fmt::Debug for SimilarityScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimilarityScorer")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl SimilarityScorer {
    pub fn new(model: LazyModel, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Scorer over a model that is already loaded.
    pub fn with_model(model: Arc<dyn SimilarityModel>, timeout: Duration) -> Self {
        Self::new(LazyModel::ready(model), timeout)
    }

    /// Validates `config` now and defers loading the CLIP weights to first use.
    ///
    /// Missing model files are reported here rather than per request.
    pub fn from_config(config: SimilarityConfig) -> Result<Self, SimilarityError> {
        config.validate()?;

        let timeout = config.timeout;
        if config.testing_stub {
            return Ok(Self::with_model(Arc::new(ClipScorer::stub()), timeout));
        }

        let model = LazyModel::new(move || {
            let scorer = ClipScorer::load(&config)?;
            Ok(Arc::new(scorer) as Arc<dyn SimilarityModel>)
        });
        Ok(Self::new(model, timeout))
    }

    /// Scores `image` against `targets`, with `contrasts` as extra softmax alternatives.
    ///
    /// Never fails. Any model error yields `passed = false, max_score = 0.0`
    /// with [`SimilarityResult::failure`] set.
    pub async fn score(
        &self,
        image: Arc<[u8]>,
        targets: &[String],
        contrasts: &[String],
        threshold: f32,
    ) -> SimilarityResult {
        match self.try_score(image, targets, contrasts, threshold).await {
            Ok(result) => {
                debug!(
                    max_score = result.max_score,
                    avg_score = result.avg_score,
                    best_phrase = ?result.best_phrase,
                    passed = result.passed,
                    "Similarity scored"
                );
                result
            }
            Err(e) => {
                warn!(error = %e, "Similarity scoring failed");
                SimilarityResult::failed(threshold, e.to_string())
            }
        }
    }

    async fn try_score(
        &self,
        image: Arc<[u8]>,
        targets: &[String],
        contrasts: &[String],
        threshold: f32,
    ) -> Result<SimilarityResult, SimilarityError> {
        let (phrases, target_count) = candidate_set(targets, contrasts);
        if target_count == 0 {
            return Err(SimilarityError::NoCandidates);
        }

        // One deadline covers a cold model load and the scoring itself.
        let batch = phrases.clone();
        let scoring = async {
            let model = self.model.get().await?;
            tokio::task::spawn_blocking(move || model.embed_and_score(&image, &batch))
                .await
                .map_err(|e| SimilarityError::InferenceFailed {
                    reason: format!("scoring task failed: {e}"),
                })?
        };

        let probabilities = tokio::time::timeout(self.timeout, scoring)
            .await
            .map_err(|_| SimilarityError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            })??;

        if probabilities.len() != phrases.len() {
            return Err(SimilarityError::OutputMismatch {
                expected: phrases.len(),
                actual: probabilities.len(),
            });
        }

        Ok(SimilarityResult::from_probabilities(
            &probabilities[..target_count],
            &phrases[..target_count],
            threshold,
        ))
    }

    /// Model label, or `None` before the first load.
    pub fn model_name(&self) -> Option<String> {
        self.model.peek().map(|m| m.name().to_string())
    }

    /// `Some(true)` for stub/mock models, `None` before the first load.
    pub fn is_stub(&self) -> Option<bool> {
        self.model.peek().map(|m| m.is_stub())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    /// Forces the lazy model to load now.
    pub async fn warm_up(&self) -> Result<(), SimilarityError> {
        self.model.get().await.map(|_| ())
    }
}
