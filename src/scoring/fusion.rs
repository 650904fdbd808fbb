use std::env;

use serde::Serialize;
use tracing::debug;

use crate::constants::{
    DEFAULT_APPROVE_THRESHOLD, DEFAULT_CONSISTENCY_THRESHOLD, DEFAULT_REVIEW_THRESHOLD,
    DEFAULT_WEIGHT_CONSISTENCY, DEFAULT_WEIGHT_CROSS_CONFIDENCE, DEFAULT_WEIGHT_KEYWORD,
    DEFAULT_WEIGHT_SIMILARITY, FORBIDDEN_VETO_CONFIDENCE, WEIGHT_SUM_TOLERANCE, clamp_unit,
};
use crate::similarity::SimilarityResult;

use super::error::ScoringError;
use super::types::{CrossExamResult, Decision, FusionOutcome, KeywordResult};

/// Weights of the four fused terms. Must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionWeights {
    pub cross_confidence: f32,
    pub consistency: f32,
    pub similarity: f32,
    pub keyword: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            cross_confidence: DEFAULT_WEIGHT_CROSS_CONFIDENCE,
            consistency: DEFAULT_WEIGHT_CONSISTENCY,
            similarity: DEFAULT_WEIGHT_SIMILARITY,
            keyword: DEFAULT_WEIGHT_KEYWORD,
        }
    }
}

impl FusionWeights {
    pub fn sum(&self) -> f32 {
        self.cross_confidence + self.consistency + self.similarity + self.keyword
    }

    fn as_array(&self) -> [f32; 4] {
        [
            self.cross_confidence,
            self.consistency,
            self.similarity,
            self.keyword,
        ]
    }

    /// Parses `"cross,consistency,similarity,keyword"`.
    pub fn parse(value: &str) -> Result<Self, ScoringError> {
        let parts: Vec<f32> = value
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|e| ScoringError::ParseError {
                name: FusionConfig::ENV_WEIGHTS,
                value: value.to_string(),
                reason: e.to_string(),
            })?;

        let [cross_confidence, consistency, similarity, keyword] = parts[..] else {
            return Err(ScoringError::ParseError {
                name: FusionConfig::ENV_WEIGHTS,
                value: value.to_string(),
                reason: format!("expected 4 comma-separated weights, got {}", parts.len()),
            });
        };

        Ok(Self {
            cross_confidence,
            consistency,
            similarity,
            keyword,
        })
    }
}

/// Fusion weights and decision bands.
///
/// Defaults: weights `0.35/0.25/0.25/0.15`, approve at `0.8`, review at `0.5`,
/// consistency cut-off `0.7`. Override with `GREENPROOF_*` variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FusionConfig {
    pub weights: FusionWeights,
    pub approve_threshold: f32,
    pub review_threshold: f32,
    pub consistency_threshold: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: FusionWeights::default(),
            approve_threshold: DEFAULT_APPROVE_THRESHOLD,
            review_threshold: DEFAULT_REVIEW_THRESHOLD,
            consistency_threshold: DEFAULT_CONSISTENCY_THRESHOLD,
        }
    }
}

impl FusionConfig {
    pub const ENV_WEIGHTS: &'static str = "GREENPROOF_FUSION_WEIGHTS";
    pub const ENV_APPROVE_THRESHOLD: &'static str = "GREENPROOF_APPROVE_THRESHOLD";
    pub const ENV_REVIEW_THRESHOLD: &'static str = "GREENPROOF_REVIEW_THRESHOLD";
    pub const ENV_CONSISTENCY_THRESHOLD: &'static str = "GREENPROOF_CONSISTENCY_THRESHOLD";

    /// Loads overrides from the environment and validates the result.
    pub fn from_env() -> Result<Self, ScoringError> {
        let defaults = Self::default();

        let weights = match env::var(Self::ENV_WEIGHTS) {
            Ok(value) if !value.trim().is_empty() => FusionWeights::parse(&value)?,
            _ => defaults.weights,
        };

        let config = Self {
            weights,
            approve_threshold: Self::parse_f32_from_env(
                Self::ENV_APPROVE_THRESHOLD,
                defaults.approve_threshold,
            )?,
            review_threshold: Self::parse_f32_from_env(
                Self::ENV_REVIEW_THRESHOLD,
                defaults.review_threshold,
            )?,
            consistency_threshold: Self::parse_f32_from_env(
                Self::ENV_CONSISTENCY_THRESHOLD,
                defaults.consistency_threshold,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        let weights = self.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ScoringError::InvalidConfig {
                name: Self::ENV_WEIGHTS,
                reason: format!("weights must be non-negative, got {:?}", weights),
            });
        }

        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ScoringError::InvalidConfig {
                name: Self::ENV_WEIGHTS,
                reason: format!("weights must sum to 1.0, got {}", sum),
            });
        }

        for (name, value) in [
            (Self::ENV_APPROVE_THRESHOLD, self.approve_threshold),
            (Self::ENV_REVIEW_THRESHOLD, self.review_threshold),
            (Self::ENV_CONSISTENCY_THRESHOLD, self.consistency_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ScoringError::InvalidConfig {
                    name,
                    reason: format!("must be between 0.0 and 1.0, got {}", value),
                });
            }
        }

        if self.approve_threshold < self.review_threshold {
            return Err(ScoringError::InvalidConfig {
                name: Self::ENV_APPROVE_THRESHOLD,
                reason: format!(
                    "approve threshold {} is below review threshold {}",
                    self.approve_threshold, self.review_threshold
                ),
            });
        }

        Ok(())
    }

    /// Maps a confidence to its decision band.
    pub fn decide(&self, confidence: f32) -> Decision {
        if confidence >= self.approve_threshold {
            Decision::Approved
        } else if confidence >= self.review_threshold {
            Decision::NeedsReview
        } else {
            Decision::Rejected
        }
    }

    fn parse_f32_from_env(name: &'static str, default: f32) -> Result<f32, ScoringError> {
        match env::var(name) {
            Ok(value) if !value.trim().is_empty() => {
                value
                    .trim()
                    .parse::<f32>()
                    .map_err(|e| ScoringError::ParseError {
                        name,
                        value: value.clone(),
                        reason: e.to_string(),
                    })
            }
            _ => Ok(default),
        }
    }
}

/// Combines the three signals into one confidence and decision.
#[derive(Debug, Clone, Copy)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            config: FusionConfig::default(),
        }
    }
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self, ScoringError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Weighted sum, clamped to `[0, 1]`.
    pub fn weighted_confidence(
        &self,
        clip: &SimilarityResult,
        cross: &CrossExamResult,
        keyword: &KeywordResult,
    ) -> f32 {
        let w = &self.config.weights;
        clamp_unit(
            w.cross_confidence * clamp_unit(cross.combined_confidence)
                + w.consistency * clamp_unit(cross.consistency_score)
                + w.similarity * clamp_unit(clip.max_score)
                + w.keyword * clamp_unit(1.0 - keyword.penalty),
        )
    }

    /// Fuses the signals, applying the similarity and forbidden-keyword vetoes.
    pub fn fuse(
        &self,
        clip: &SimilarityResult,
        cross: &CrossExamResult,
        keyword: &KeywordResult,
    ) -> FusionOutcome {
        if keyword.has_forbidden() {
            return FusionOutcome {
                confidence: FORBIDDEN_VETO_CONFIDENCE,
                decision: Decision::Rejected,
            };
        }

        if !clip.passed {
            return FusionOutcome {
                confidence: clamp_unit(clip.max_score),
                decision: Decision::Rejected,
            };
        }

        let confidence = self.weighted_confidence(clip, cross, keyword);
        let decision = self.config.decide(confidence);

        debug!(
            confidence,
            decision = %decision,
            combined = cross.combined_confidence,
            consistency = cross.consistency_score,
            similarity = clip.max_score,
            keyword_penalty = keyword.penalty,
            "Fused verification signals"
        );

        FusionOutcome {
            confidence,
            decision,
        }
    }

    pub fn decide(&self, confidence: f32) -> Decision {
        self.config.decide(confidence)
    }
}
