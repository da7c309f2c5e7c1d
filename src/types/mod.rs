use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Body of `POST /ask`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskRequest {
    /// The question to answer from the indexed documents.
    pub question: String,
}

/// Successful response of `POST /ask`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub vector_store: String,
    /// Collection searched for context
    pub collection: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Name of the loaded prompt template
    pub prompt: String,
}

/// Structured error body returned for every failed request.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Stable machine-readable code, e.g. `retrieval_unavailable`.
    pub code: String,
    pub message: String,
}

// ============= Chat Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ============= RAG Types =============

/// A previously indexed text fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    pub score: f32,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code reported in the error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::RetrievalUnavailable(_) => "retrieval_unavailable",
            AppError::GenerationFailed(_) => "generation_failed",
            AppError::Configuration(_) => "configuration_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RetrievalUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to API callers. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidRequest(msg) => msg.clone(),
            AppError::RetrievalUnavailable(_) => {
                "The document index is currently unavailable".to_string()
            }
            AppError::GenerationFailed(_) => {
                "The language model failed to produce an answer".to_string()
            }
            AppError::Configuration(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.public_message(),
            },
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
