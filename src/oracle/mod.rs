//! Vision-language oracle boundary.
//!
//! [`VisionOracle::ask`] sends one image plus an instruction and returns the raw
//! reply text. [`OracleJudgment`] turns that text into typed fields.

pub mod client;
pub mod error;
pub mod judgment;
pub mod prompts;

#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::GenaiOracle;
pub use error::OracleError;
pub use judgment::{OracleJudgment, strip_code_fence};
pub use prompts::{PromptKind, affirmative_prompt, negative_prompt};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockOracle;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};
use tracing::info;

use crate::config::{Config, MOCK_ORACLE_PREFIX};

/// Content type assumed when the bytes match no known image signature.
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// Image bytes plus their sniffed MIME type. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    bytes: Arc<[u8]>,
    content_type: &'static str,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let content_type = image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_CONTENT_TYPE);
        Self {
            bytes,
            content_type,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the bytes (for blocking-pool work).
    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[async_trait]
/// Vision-language model that answers free-text instructions about an image.
pub trait VisionOracle: Send + Sync {
    async fn ask(&self, image: &ImagePayload, instruction: &str) -> Result<String, OracleError>;

    /// Model label for logs and the API `model` field.
    fn model_name(&self) -> &str;
}

/// [`VisionOracle::ask`] bounded by `timeout`; expiry maps to [`OracleError::Timeout`].
pub async fn ask_with_timeout(
    oracle: &dyn VisionOracle,
    image: &ImagePayload,
    instruction: &str,
    timeout: Duration,
) -> Result<String, OracleError> {
    match tokio::time::timeout(timeout, oracle.ask(image, instruction)).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Oracle wrapper (real or mock).
pub enum OracleBackend {
    /// `genai`-backed client.
    Genai(GenaiOracle),
    #[cfg(any(test, feature = "mock"))]
    /// Scripted in-process oracle.
    Mock(MockOracle),
}

impl std::fmt::Debug for OracleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleBackend::Genai(o) => f.debug_tuple("Genai").field(o).finish(),
            #[cfg(any(test, feature = "mock"))]
            OracleBackend::Mock(_) => f.write_str("Mock"),
        }
    }
}

impl OracleBackend {
    /// Builds the oracle named by `config.oracle_model` (`mock:` names require the `mock` feature).
    ///
    /// Mock names: `mock:unavailable` fails every call, anything else approves.
    pub fn from_config(config: &Config) -> Result<Self, OracleError> {
        let model = config.oracle_model.as_str();

        if let Some(scenario) = model.strip_prefix(MOCK_ORACLE_PREFIX) {
            #[cfg(any(test, feature = "mock"))]
            {
                info!(scenario, "Using mock vision oracle");
                let oracle = match scenario {
                    "unavailable" => MockOracle::unavailable("mock oracle unavailable"),
                    _ => MockOracle::approving(),
                };
                return Ok(Self::Mock(oracle));
            }
            #[cfg(not(any(test, feature = "mock")))]
            {
                let _ = scenario;
                return Err(OracleError::InvalidConfig {
                    reason: "Mock oracle not enabled. Compile with --features mock".to_string(),
                });
            }
        }

        if model.trim().is_empty() {
            return Err(OracleError::InvalidConfig {
                reason: "oracle model name cannot be empty".to_string(),
            });
        }

        let key_env = config.oracle_api_key_env.clone();
        let auth = AuthResolver::from_resolver_fn(
            move |_model: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_env(key_env.clone())))
            },
        );
        let client = Client::builder().with_auth_resolver(auth).build();

        info!(model, key_env = %config.oracle_api_key_env, "Using genai vision oracle");
        Ok(Self::Genai(GenaiOracle::with_client(client, model)))
    }

    pub fn is_mock(&self) -> bool {
        match self {
            OracleBackend::Genai(_) => false,
            #[cfg(any(test, feature = "mock"))]
            OracleBackend::Mock(_) => true,
        }
    }
}

#[async_trait]
impl VisionOracle for OracleBackend {
    async fn ask(&self, image: &ImagePayload, instruction: &str) -> Result<String, OracleError> {
        match self {
            OracleBackend::Genai(o) => o.ask(image, instruction).await,
            #[cfg(any(test, feature = "mock"))]
            OracleBackend::Mock(o) => o.ask(image, instruction).await,
        }
    }

    fn model_name(&self) -> &str {
        match self {
            OracleBackend::Genai(o) => o.model_name(),
            #[cfg(any(test, feature = "mock"))]
            OracleBackend::Mock(o) => o.model_name(),
        }
    }
}
