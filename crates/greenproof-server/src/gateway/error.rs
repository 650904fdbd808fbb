use axum::{
    Json,
    extract::multipart::MultipartError,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use super::STATUS_HEADER;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("image exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },
}

impl From<MultipartError> for GatewayError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            GatewayError::PayloadTooLarge {
                limit: super::MAX_UPLOAD_BYTES,
            }
        } else {
            GatewayError::Multipart(e.body_text())
        }
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: u16,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, status_value) = match &self {
            GatewayError::MissingField(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::Multipart(_) => (StatusCode::BAD_REQUEST, "malformed_body"),
            GatewayError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large")
            }
        };

        let mut headers = HeaderMap::new();
        headers.insert(STATUS_HEADER, HeaderValue::from_static(status_value));

        let body = Json(ErrorResponse {
            success: false,
            error: self.to_string(),
            code: status.as_u16(),
        });

        (status, headers, body).into_response()
    }
}
