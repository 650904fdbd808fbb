//! HTTP gateway (Axum) for photo verification.
//!
//! This module is primarily used by the `greenproof` server binary.

pub mod error;
pub mod handler;
pub mod payload;
pub mod state;


use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use handler::{challenges_handler, verify_handler};
pub use state::HandlerState;

/// Response header carrying the decision or error class.
pub const STATUS_HEADER: &str = "x-greenproof-status";
pub const STATUS_HEALTHY: &str = "healthy";
pub const STATUS_READY: &str = "ready";

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn create_router_with_state(state: HandlerState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/challenges", get(challenges_handler))
        .route("/verify", post(verify_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    /// `ready` once the weights are loaded, `lazy` before first use.
    pub similarity: &'static str,
    pub similarity_mode: &'static str,
    pub oracle_mode: &'static str,
    pub oracle_model: String,
    pub challenges: usize,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(STATUS_HEALTHY));

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler(State(state): State<HandlerState>) -> Response {
    let engine = state.orchestrator.status();

    let similarity = if engine.similarity_loaded {
        STATUS_READY
    } else {
        "lazy"
    };
    let similarity_mode = match engine.similarity_stub {
        Some(true) => "stub",
        Some(false) => "real",
        None => "unknown",
    };
    let oracle_mode = if state.mock_oracle { "mock" } else { "real" };

    let components = ComponentStatus {
        http: STATUS_READY,
        similarity,
        similarity_mode,
        oracle_mode,
        oracle_model: engine.oracle_model,
        challenges: engine.challenges,
    };

    let is_ready = components.challenges > 0;
    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let status_msg = if is_ready { "ok" } else { "pending" };

    let mut headers = HeaderMap::new();
    headers.insert(STATUS_HEADER, HeaderValue::from_static(status_msg));

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
