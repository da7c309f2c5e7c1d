use crate::AppState;
use crate::api::{ApiDoc, handlers};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Empty `origins` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    Router::new()
        .route("/ask", post(handlers::ask::ask))
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&server.cors_origins)),
        )
        // Oversized bodies surface as a `Json` rejection, answered as 400.
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .with_state(state)
}
