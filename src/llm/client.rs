//! LLM Client abstractions and provider management
//!
//! Supported chat providers:
//! - **Gemini**: hosted Google Gemini `generateContent` API (default)
//! - **Ollama**: local inference through an Ollama server (`ollama` feature)

use crate::types::{ChatMessage, Result};
use crate::utils::toml_config::{LlmConfig, ProviderKind};
use async_trait::async_trait;
use std::time::Duration;

/// Generic LLM client trait for provider abstraction
///
/// All chat providers implement this trait so the generator never depends
/// on a concrete backend.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send an ordered conversation and return the model's text reply
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Generate a completion from a single user prompt
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(&[ChatMessage::user(prompt)]).await
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini REST API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: Some("AIza...".to_string()),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.5-flash".to_string(),
    ///     temperature: None,
    ///     timeout: Duration::from_secs(60),
    /// };
    /// ```
    Gemini {
        /// Missing keys are accepted here; requests fail until one is set.
        api_key: Option<String>,
        api_base: String,
        model: String,
        temperature: Option<f32>,
        timeout: Duration,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Build the provider described by the `[llm]` config section.
    pub fn from_config(config: &LlmConfig, api_key: Option<String>) -> Self {
        match config.provider {
            ProviderKind::Gemini => Provider::Gemini {
                api_key,
                api_base: config.api_base().to_string(),
                model: config.model.clone(),
                temperature: config.temperature,
                timeout: Duration::from_secs(config.timeout_secs),
            },
            ProviderKind::Ollama => Provider::Ollama {
                base_url: config.api_base().to_string(),
                model: config.model.clone(),
            },
        }
    }

    /// Create a client instance for this provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's feature is disabled or the HTTP
    /// client cannot be built.
    pub fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
                temperature,
                timeout,
            } => Ok(Box::new(super::gemini::GeminiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                *temperature,
                *timeout,
            )?)),

            #[cfg(feature = "ollama")]
            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url, model.clone())?,
            )),

            #[cfg(not(feature = "ollama"))]
            Provider::Ollama { .. } => Err(crate::types::AppError::Configuration(
                "Ollama provider not enabled. Rebuild with the `ollama` feature.".to_string(),
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Gemini { .. } => "Gemini",
            Provider::Ollama { .. } => "Ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. } | Provider::Ollama { model, .. } => model,
        }
    }
}
