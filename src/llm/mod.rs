//! LLM Provider Clients and Abstractions
//!
//! A unified interface over the chat models the generator can call.
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection built from the `[llm]` config section
//!
//! # Supported Providers
//!
//! - Gemini (always available) - hosted `generateContent` REST API
//! - `ollama` feature - local Ollama server
//!
//! # Example
//!
//! ```ignore
//! use study_rag::llm::Provider;
//!
//! let client = Provider::from_config(&config.llm, config.llm_api_key()).create_client()?;
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
/// Google Gemini chat client.
pub mod gemini;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use client::{LLMClient, Provider};
