use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read challenge table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed challenge table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("challenge code '{code}' is defined more than once")]
    DuplicateCode { code: String },

    #[error("invalid challenge '{code}': {reason}")]
    InvalidSpec { code: String, reason: String },
}
