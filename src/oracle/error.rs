use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {reason}")]
    Transport { reason: String },

    #[error("oracle call exceeded {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("invalid oracle configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<genai::Error> for OracleError {
    fn from(err: genai::Error) -> Self {
        OracleError::Transport {
            reason: err.to_string(),
        }
    }
}
