use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("invalid fusion configuration ({name}): {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("failed to parse {name}='{value}': {reason}")]
    ParseError {
        name: &'static str,
        value: String,
        reason: String,
    },
}
