use axum::{
    Json,
    extract::{Multipart, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{info, instrument};

use greenproof::{ImagePayload, VerificationRequest};

use super::STATUS_HEADER;
use super::error::GatewayError;
use super::payload::{ChallengeSummary, VerifyForm, VerifyResponse};
use super::state::HandlerState;

#[instrument(skip(state, multipart), fields(code = tracing::field::Empty))]
pub async fn verify_handler(
    State(state): State<HandlerState>,
    multipart: Multipart,
) -> Result<Response, GatewayError> {
    let form = VerifyForm::from_multipart(multipart).await?;
    tracing::Span::current().record("code", form.challenge_code.as_str());

    let spec = state
        .orchestrator
        .lookup(&form.challenge_code, &form.challenge_title);

    let mut request = VerificationRequest::new(ImagePayload::new(form.image.to_vec()), spec);
    if let Some(member_id) = form.member_id {
        request = request.with_member(member_id);
    }

    let outcome = state.orchestrator.verify(request).await;
    info!(
        decision = %outcome.decision,
        confidence = outcome.confidence,
        request_id = %outcome.request_id,
        "Verification served"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        STATUS_HEADER,
        HeaderValue::from_static(outcome.decision.as_str()),
    );

    Ok((StatusCode::OK, headers, Json(VerifyResponse::from(outcome))).into_response())
}

#[instrument(skip(state))]
pub async fn challenges_handler(State(state): State<HandlerState>) -> Json<Vec<ChallengeSummary>> {
    let challenges = state
        .orchestrator
        .registry()
        .specs()
        .into_iter()
        .map(|spec| ChallengeSummary {
            code: spec.code.clone(),
            title: spec.title.clone(),
            similarity_threshold: spec.similarity_threshold,
            keyword_match_threshold: spec.keyword_match_threshold,
        })
        .collect();

    Json(challenges)
}
