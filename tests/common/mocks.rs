//! Mock collaborators for the RAG pipeline.
//!
//! Each mock counts its calls so tests can assert which steps ran.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use study_rag::{
    AppConfig, AppState, RagPipeline,
    db::{CollectionStats, InMemoryVectorStore, VectorStore},
    llm::LLMClient,
    rag::{EmbeddingClient, PromptTemplate},
    types::{AppError, ChatMessage, Document, Result, SearchResult},
};

/// Collection name used by every test config.
pub const COLLECTION: &str = "example_collection";

/// Dimensions of the vectors handed out by [`MockEmbeddingClient`].
pub const DIMENSIONS: usize = 3;

/// Mock LLM client that returns a canned answer or fails.
pub struct MockLLMClient {
    response: String,
    should_fail: bool,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<ChatMessage>>,
}

impl MockLLMClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            should_fail: false,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// A client whose every call errors.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages from the most recent call.
    pub fn last_messages(&self) -> Vec<ChatMessage> {
        self.last_messages.lock().clone()
    }

    /// Concatenated content of the most recent call.
    pub fn last_prompt(&self) -> String {
        self.last_messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_messages.lock() = messages.to_vec();

        if self.should_fail {
            return Err(AppError::GenerationFailed(
                "Mock LLM failure".to_string(),
            ));
        }
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}

/// Mock embedding client returning the same unit vector for any text.
pub struct MockEmbeddingClient {
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockEmbeddingClient {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            should_fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingClient for MockEmbeddingClient {
    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(AppError::RetrievalUnavailable(
                "Mock embedding failure".to_string(),
            ));
        }
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn model_name(&self) -> &str {
        "mock-embedding"
    }
}

/// Store whose collection exists but whose search always fails.
pub struct UnreachableStore;

#[async_trait]
impl VectorStore for UnreachableStore {
    fn provider_name(&self) -> &'static str {
        "unreachable"
    }

    async fn create_collection(&self, _name: &str, _dimensions: usize) -> Result<()> {
        Ok(())
    }

    async fn collection_exists(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        Err(AppError::RetrievalUnavailable(format!(
            "{} is unreachable",
            name
        )))
    }

    async fn upsert(&self, _collection: &str, _documents: &[Document]) -> Result<usize> {
        Err(AppError::RetrievalUnavailable("store is unreachable".to_string()))
    }

    async fn search(
        &self,
        _collection: &str,
        _query_embedding: &[f32],
        _limit: usize,
        _threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        Err(AppError::RetrievalUnavailable("store is unreachable".to_string()))
    }
}

/// In-memory store with `fragments` ingested in order of decreasing
/// similarity to the mock question vector.
pub async fn seeded_store(fragments: &[&str]) -> Arc<InMemoryVectorStore> {
    let store = InMemoryVectorStore::new();
    store
        .create_collection(COLLECTION, DIMENSIONS)
        .await
        .expect("create collection");

    let documents: Vec<Document> = fragments
        .iter()
        .enumerate()
        .map(|(i, text)| {
            // Each later fragment leans further away from [1, 0, 0].
            let off_axis = i as f32 * 0.25;
            Document::new(format!("doc-{}", i), *text).with_embedding(vec![1.0, off_axis, 0.0])
        })
        .collect();

    store
        .upsert(COLLECTION, &documents)
        .await
        .expect("upsert fragments");
    Arc::new(store)
}

/// Configuration matching the mocks above.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.vector_store.collection = COLLECTION.to_string();
    config.vector_store.top_k = 4;
    config
}

/// Build shared state around explicit collaborators.
pub fn app_state(
    config: AppConfig,
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LLMClient>,
) -> AppState {
    let pipeline = RagPipeline::from_parts(
        &config,
        embeddings,
        store,
        llm,
        Arc::new(PromptTemplate::builtin()),
    );
    AppState::new(config, pipeline)
}
