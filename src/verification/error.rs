use thiserror::Error;

use crate::config::ConfigError;
use crate::oracle::OracleError;
use crate::registry::RegistryError;
use crate::scoring::ScoringError;
use crate::similarity::SimilarityError;

/// Fatal errors raised while assembling the verification engine.
///
/// Per-request failures never surface here; they become state transitions.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("challenge registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("similarity model error: {0}")]
    Similarity(#[from] SimilarityError),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("fusion configuration error: {0}")]
    Scoring(#[from] ScoringError),
}
