use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ContentPart};
use tracing::debug;

use super::error::OracleError;
use super::{ImagePayload, VisionOracle};

/// Vision-language oracle backed by `genai` (Gemini by default).
#[derive(Clone)]
pub struct GenaiOracle {
    client: Client,
    model: String,
    options: ChatOptions,
}

impl std::fmt::Debug for GenaiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiOracle")
            .field("model", &self.model)
            .finish()
    }
}

impl GenaiOracle {
    /// Uses the default `genai` client, which reads provider keys from the environment.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_client(Client::default(), model)
    }

    pub fn with_client(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            options: ChatOptions::default().with_temperature(0.0),
        }
    }

    fn build_request(image: &ImagePayload, instruction: &str) -> ChatRequest {
        let encoded = STANDARD.encode(image.bytes());
        let parts = vec![
            ContentPart::from_text(instruction),
            ContentPart::from_binary_base64(image.content_type(), encoded, None),
        ];
        ChatRequest::new(vec![ChatMessage::user(parts)])
    }
}

#[async_trait]
impl VisionOracle for GenaiOracle {
    async fn ask(&self, image: &ImagePayload, instruction: &str) -> Result<String, OracleError> {
        let request = Self::build_request(image, instruction);

        debug!(
            model = %self.model,
            image_bytes = image.len(),
            content_type = image.content_type(),
            "Calling vision oracle"
        );

        let response = self
            .client
            .exec_chat(&self.model, request, Some(&self.options))
            .await?;

        // A blank reply is malformed, not a transport failure; parsing supplies defaults.
        let text = reply_text(response.first_text());

        debug!(model = %self.model, response_len = text.len(), "Oracle replied");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Trimmed reply text; empty when the model returned nothing.
pub(crate) fn reply_text(text: Option<&str>) -> String {
    text.map(str::trim).unwrap_or_default().to_string()
}
