//! Query embedding clients.
//!
//! The retriever embeds each question with the same model that embedded the
//! indexed fragments. Gemini is reached over `embedContent`; Ollama through
//! `ollama-rs` when the `ollama` feature is enabled.

use crate::llm::gemini::{API_KEY_HEADER, Part, build_http_client, model_path, truncate_body};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{EmbeddingsConfig, ProviderKind};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    fn model_name(&self) -> &str;
}

/// Embedding backend selected from the `[embeddings]` config section.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    Gemini {
        api_key: Option<String>,
        api_base: String,
        model: String,
        timeout: Duration,
    },
    Ollama {
        base_url: String,
        model: String,
    },
}

impl EmbeddingProvider {
    pub fn from_config(config: &EmbeddingsConfig, api_key: Option<String>) -> Self {
        match config.provider {
            ProviderKind::Gemini => EmbeddingProvider::Gemini {
                api_key,
                api_base: config.api_base().to_string(),
                model: config.model.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
            },
            ProviderKind::Ollama => EmbeddingProvider::Ollama {
                base_url: config.api_base().to_string(),
                model: config.model.clone(),
            },
        }
    }

    pub fn create_client(&self) -> Result<Box<dyn EmbeddingClient>> {
        match self {
            EmbeddingProvider::Gemini {
                api_key,
                api_base,
                model,
                timeout,
            } => Ok(Box::new(GeminiEmbeddings::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *timeout,
            )?)),

            #[cfg(feature = "ollama")]
            EmbeddingProvider::Ollama { base_url, model } => {
                Ok(Box::new(OllamaEmbeddings::new(base_url, model.clone())))
            }

            #[cfg(not(feature = "ollama"))]
            EmbeddingProvider::Ollama { .. } => Err(AppError::Configuration(
                "Ollama embeddings not enabled. Rebuild with the `ollama` feature.".to_string(),
            )),
        }
    }
}

// ============================================================================
// Gemini
// ============================================================================

pub struct GeminiEmbeddings {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
}

impl GeminiEmbeddings {
    pub fn new(
        api_key: Option<String>,
        api_base: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:embedContent",
            self.api_base,
            model_path(&self.model)
        )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::RetrievalUnavailable("Gemini API key is not configured".to_string())
        })?;

        let request = EmbedContentRequest {
            model: format!("models/{}", model_path(&self.model)),
            content: EmbedContent {
                parts: vec![Part { text }],
            },
            task_type: "RETRIEVAL_QUERY",
        };

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::RetrievalUnavailable(format!("Embedding request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::RetrievalUnavailable(format!(
                "Gemini embedding API error ({}): {}",
                status,
                truncate_body(&text)
            )));
        }

        let body: EmbedContentResponse = response.json().await.map_err(|e| {
            AppError::RetrievalUnavailable(format!("Failed to parse embedding response: {}", e))
        })?;

        if body.embedding.values.is_empty() {
            return Err(AppError::RetrievalUnavailable(
                "Gemini returned an empty embedding".to_string(),
            ));
        }

        Ok(body.embedding.values)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Ollama
// ============================================================================

#[cfg(feature = "ollama")]
pub struct OllamaEmbeddings {
    client: ollama_rs::Ollama,
    model: String,
}

#[cfg(feature = "ollama")]
impl OllamaEmbeddings {
    pub fn new(base_url: &str, model: String) -> Self {
        let (host, port) = crate::llm::ollama::split_base_url(base_url);
        Self {
            client: ollama_rs::Ollama::new(host, port),
            model,
        }
    }
}

#[cfg(feature = "ollama")]
#[async_trait]
impl EmbeddingClient for OllamaEmbeddings {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        use ollama_rs::generation::embeddings::request::{
            EmbeddingsInput, GenerateEmbeddingsRequest,
        };

        let request = GenerateEmbeddingsRequest::new(
            self.model.clone(),
            EmbeddingsInput::Single(text.to_string()),
        );

        let response = self
            .client
            .generate_embeddings(request)
            .await
            .map_err(|e| AppError::RetrievalUnavailable(format!("Ollama embedding error: {}", e)))?;

        response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AppError::RetrievalUnavailable("Ollama returned no embedding".to_string())
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_embed_request_shape() {
        let request = EmbedContentRequest {
            model: format!("models/{}", model_path("models/gemini-embedding-001")),
            content: EmbedContent {
                parts: vec![Part { text: "What is RAG?" }],
            },
            task_type: "RETRIEVAL_QUERY",
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "models/gemini-embedding-001",
                "content": {"parts": [{"text": "What is RAG?"}]},
                "taskType": "RETRIEVAL_QUERY"
            })
        );
    }

    #[test]
    fn test_gemini_endpoint() {
        let client = GeminiEmbeddings::new(
            None,
            "https://generativelanguage.googleapis.com/v1beta".to_string(),
            "models/gemini-embedding-001".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:embedContent"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_retrieval_error() {
        let client = GeminiEmbeddings::new(
            None,
            "http://127.0.0.1:9".to_string(),
            "gemini-embedding-001".to_string(),
            Duration::from_secs(1),
        )
        .unwrap();
        let err = client.embed_query("hello").await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalUnavailable(_)));
    }

    #[test]
    fn test_provider_from_config() {
        let provider = EmbeddingProvider::from_config(&EmbeddingsConfig::default(), None);
        let client = provider.create_client().unwrap();
        assert_eq!(client.model_name(), "models/gemini-embedding-001");
    }
}
