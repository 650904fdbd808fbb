use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::Config;
use crate::constants::DEFAULT_SIMILARITY_TIMEOUT_MS;

use super::device::DevicePreference;
use super::error::SimilarityError;

/// Weights file expected inside the CLIP model directory.
pub const CLIP_WEIGHTS_FILE: &str = "model.safetensors";
/// Tokenizer file expected inside the CLIP model directory.
pub const CLIP_TOKENIZER_FILE: &str = "tokenizer.json";

/// Configuration for the similarity stage.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Directory holding `model.safetensors` and `tokenizer.json`.
    pub model_path: Option<PathBuf>,
    /// If true, run in deterministic stub mode (no model files required).
    pub testing_stub: bool,
    /// Bound on one scoring call, including a cold model load.
    pub timeout: Duration,
    /// Compute device for CLIP inference.
    pub device: DevicePreference,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            testing_stub: false,
            timeout: Duration::from_millis(DEFAULT_SIMILARITY_TIMEOUT_MS),
            device: DevicePreference::Auto,
        }
    }
}

impl SimilarityConfig {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: Some(model_path.into()),
            ..Default::default()
        }
    }

    pub fn stub() -> Self {
        Self {
            testing_stub: true,
            ..Default::default()
        }
    }

    /// Projects the similarity settings out of the service config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model_path: config.clip_model_path.clone(),
            testing_stub: config.similarity_stub,
            timeout: config.similarity_timeout,
            device: config.similarity_device,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_device(mut self, device: DevicePreference) -> Self {
        self.device = device;
        self
    }

    /// Checks that the model files are present (unless in stub mode).
    pub fn validate(&self) -> Result<(), SimilarityError> {
        if self.timeout.is_zero() {
            return Err(SimilarityError::InvalidConfig {
                reason: "timeout must be positive".to_string(),
            });
        }

        if self.testing_stub {
            return Ok(());
        }

        let Some(dir) = self.model_path.as_deref() else {
            return Err(SimilarityError::InvalidConfig {
                reason: "model_path is required outside stub mode".to_string(),
            });
        };

        if !dir.is_dir() {
            return Err(SimilarityError::ModelNotFound {
                path: dir.to_path_buf(),
            });
        }

        for file in [CLIP_WEIGHTS_FILE, CLIP_TOKENIZER_FILE] {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(SimilarityError::ModelNotFound { path });
            }
        }

        Ok(())
    }

    pub fn weights_path(&self) -> Option<PathBuf> {
        self.model_path.as_deref().map(|p| p.join(CLIP_WEIGHTS_FILE))
    }

    pub fn model_dir(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }
}
