//! Google Gemini chat client over the `generateContent` REST endpoint.

use crate::llm::client::LLMClient;
use crate::types::{AppError, ChatMessage, MessageRole, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the Gemini API key.
pub(crate) const API_KEY_HEADER: &str = "x-goog-api-key";

/// Longest slice of an upstream error body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

/// `models/gemini-embedding-001` and `gemini-embedding-001` address the same model.
pub(crate) fn model_path(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

pub(crate) fn truncate_body(body: &str) -> &str {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        api_base: String,
        model: String,
        temperature: Option<f32>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.api_base,
            model_path(&self.model)
        )
    }

    fn build_request<'a>(&self, messages: &'a [ChatMessage]) -> GenerateContentRequest<'a> {
        let system_parts: Vec<Part<'a>> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| Part { text: &m.content })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| Content {
                role: Some(match m.role {
                    MessageRole::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part { text: &m.content }],
            })
            .collect();

        GenerateContentRequest {
            contents,
            system_instruction: if system_parts.is_empty() {
                None
            } else {
                Some(Content {
                    role: None,
                    parts: system_parts,
                })
            },
            generation_config: self
                .temperature
                .map(|temperature| GenerationConfig { temperature }),
        }
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::GenerationFailed("Gemini API key is not configured".to_string())
        })?;

        if !messages.iter().any(|m| m.role != MessageRole::System) {
            return Err(AppError::GenerationFailed(
                "Gemini requires at least one user message".to_string(),
            ));
        }

        let request = self.build_request(messages);

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::GenerationFailed(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::GenerationFailed(format!(
                "Gemini API error ({}): {}",
                status,
                truncate_body(&text)
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::GenerationFailed(format!("Failed to parse Gemini response: {}", e))
        })?;

        body.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ============= Wire Types =============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct Part<'a> {
    pub(crate) text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenate the text parts of the first candidate.
    fn into_text(self) -> Result<String> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AppError::GenerationFailed(format!(
                "Gemini blocked the prompt: {}",
                reason
            )));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::GenerationFailed("No candidates from Gemini".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AppError::GenerationFailed(format!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}
