//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`embeddings`] - query embedding clients (Gemini, Ollama)
//! - [`retriever`] - embeds the question and searches the vector store
//! - [`prompt`] - chat prompt templates and the prompt hub loader
//! - [`generator`] - renders the prompt and calls the chat model
//! - [`pipeline`] - per-request state and the retrieve → generate orchestrator
//!
//! # Example
//!
//! ```ignore
//! use study_rag::rag::RagPipeline;
//!
//! let pipeline = RagPipeline::from_config(&config).await?;
//! let state = pipeline.invoke("What is the capital of France?").await?;
//! println!("{}", state.answer().unwrap_or_default());
//! ```

pub mod embeddings;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use embeddings::{EmbeddingClient, EmbeddingProvider};
pub use generator::{Generator, format_context};
pub use pipeline::{GenerationUpdate, PipelineState, RagPipeline, RetrievalUpdate};
pub use prompt::PromptTemplate;
pub use retriever::Retriever;
