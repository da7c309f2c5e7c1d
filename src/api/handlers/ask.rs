//! Question answering over the indexed documents.

use crate::{
    AppState,
    types::{AppError, AskRequest, AskResponse, ErrorResponse, Result},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde_json::Value;
use std::time::Instant;

/// Decode the body as an `AskRequest`, accepting only a JSON object.
///
/// A derived `Deserialize` also takes the sequence form `["..."]`, so the
/// shape is checked on the raw value first.
fn parse_request(payload: std::result::Result<Json<Value>, JsonRejection>) -> Result<AskRequest> {
    let Json(value) = payload.map_err(|rejection| {
        AppError::InvalidRequest(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    if !value.is_object() {
        return Err(AppError::InvalidRequest(
            "Invalid request body: expected a JSON object with a `question` field".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid request body: {}", e)))
}

/// Answer a question with retrieve-then-generate.
#[utoipa::path(
    post,
    path = "/ask",
    request_body = AskRequest,
    responses(
        (status = 200, description = "Answer generated", body = AskResponse),
        (status = 400, description = "Malformed body or empty question", body = ErrorResponse),
        (status = 502, description = "Chat model failed", body = ErrorResponse),
        (status = 503, description = "Document index unavailable", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "rag"
)]
pub async fn ask(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> Result<Json<AskResponse>> {
    let payload = parse_request(payload)?;

    let start = Instant::now();
    let result = state.pipeline.invoke(payload.question).await?;

    let answer = result
        .into_answer()
        .ok_or_else(|| AppError::Internal("Pipeline finished without an answer".to_string()))?;

    tracing::info!(
        answer_chars = answer.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Answered question"
    );

    Ok(Json(AskResponse { answer }))
}
