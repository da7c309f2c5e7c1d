//! # study-rag-server
//!
//! A retrieval-augmented question-answering server. Each `POST /ask` embeds
//! the question, pulls the nearest fragments from a persistent vector store,
//! renders a prompt template, and returns the chat model's answer.
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use study_rag::{AppConfig, RagPipeline};
//!
//! let config = AppConfig::load_with_env("study-rag.toml")?;
//! let pipeline = RagPipeline::from_config(&config).await?;
//! let state = pipeline.invoke("What is the capital of France?").await?;
//! println!("{}", state.answer().unwrap_or_default());
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `ares-vector` | Persistent embedded HNSW store (default) |
//! | `ollama` | Ollama chat and embeddings (default) |
//!
//! ## Modules
//!
//! - [`api`] - REST handlers and routes
//! - [`cli`] - command-line parsing and terminal output
//! - [`db`] - vector store abstraction
//! - [`llm`] - chat model clients
//! - [`rag`] - retriever, generator and pipeline
//! - [`types`] - request/response types and errors
//! - [`utils`] - configuration and logging

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector stores.
pub mod db;
/// LLM provider clients and abstractions.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration and logging utilities.
pub mod utils;

pub use llm::{LLMClient, Provider};
pub use rag::{PipelineState, RagPipeline};
pub use types::{AppError, Result};
pub use utils::toml_config::AppConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Effective configuration, fixed at startup
    pub config: Arc<AppConfig>,
    /// Retrieve-then-generate pipeline with its clients
    pub pipeline: Arc<RagPipeline>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: RagPipeline) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        }
    }

    /// Construct every collaborator named by `config`.
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let pipeline = RagPipeline::from_config(&config).await?;
        Ok(Self::new(config, pipeline))
    }
}
