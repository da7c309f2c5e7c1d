use crate::{AppState, types::HealthResponse};
use axum::{Json, extract::State};

/// Liveness plus the models and store this instance is wired to.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let retriever = state.pipeline.retriever();
    let generator = state.pipeline.generator();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        vector_store: retriever.store_name().to_string(),
        collection: retriever.collection().to_string(),
        chat_model: generator.chat_model().to_string(),
        embedding_model: retriever.embedding_model().to_string(),
        prompt: generator.prompt().name().to_string(),
    })
}
