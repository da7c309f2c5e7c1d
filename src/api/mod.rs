//! HTTP API Handlers and Routes
//!
//! # API Endpoints
//!
//! - `POST /ask` - answer a question from the indexed documents
//! - `GET /health` - liveness and wiring information
//! - `GET /api-docs/openapi.json` - OpenAPI document
//!
//! Errors use one body shape:
//! ```text
//! {"error": {"code": "retrieval_unavailable", "message": "..."}}
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::types::{AskRequest, AskResponse, ErrorDetail, ErrorResponse, HealthResponse};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "study-rag-server", description = "Retrieval-augmented question answering"),
    paths(handlers::ask::ask, handlers::health::health),
    components(schemas(AskRequest, AskResponse, HealthResponse, ErrorResponse, ErrorDetail)),
    tags(
        (name = "rag", description = "Question answering"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;
