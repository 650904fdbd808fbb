use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("similarity model not found at path: {path}")]
    ModelNotFound { path: PathBuf },

    #[error("failed to load similarity model: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable { device: String, reason: String },

    #[error("similarity inference failed: {reason}")]
    InferenceFailed { reason: String },

    #[error("tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("image could not be decoded: {reason}")]
    ImageDecode { reason: String },

    #[error("invalid similarity configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("no candidate phrases to score")]
    NoCandidates,

    #[error("model returned {actual} scores for {expected} phrases")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("similarity scoring exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl From<candle_core::Error> for SimilarityError {
    fn from(err: candle_core::Error) -> Self {
        SimilarityError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for SimilarityError {
    fn from(err: std::io::Error) -> Self {
        SimilarityError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}
