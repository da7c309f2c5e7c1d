//! Retrieve-then-generate orchestration.
//!
//! ```text
//! START ──▶ retrieve ──▶ generate ──▶ END
//! ```
//!
//! Each step reads the [`PipelineState`] and returns a partial update that
//! the orchestrator applies before the next step runs.

use crate::db::{VectorStore, VectorStoreProvider};
use crate::llm::{LLMClient, Provider};
use crate::rag::embeddings::{EmbeddingClient, EmbeddingProvider};
use crate::rag::generator::Generator;
use crate::rag::prompt::PromptTemplate;
use crate::rag::retriever::Retriever;
use crate::types::{AppError, Document, Result};
use crate::utils::toml_config::AppConfig;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;
use uuid::Uuid;

/// Per-request record threaded through the steps.
#[derive(Debug, Clone)]
pub struct PipelineState {
    question: String,
    context: Vec<Document>,
    answer: Option<String>,
}

impl PipelineState {
    /// Start a run for `question`.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidRequest`] when the question is empty or whitespace.
    pub fn new(question: impl Into<String>) -> Result<Self> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "question must not be empty".to_string(),
            ));
        }
        Ok(Self {
            question,
            context: Vec::new(),
            answer: None,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn context(&self) -> &[Document] {
        &self.context
    }

    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    pub fn into_answer(self) -> Option<String> {
        self.answer
    }

    pub(crate) fn apply_retrieval(&mut self, update: RetrievalUpdate) {
        debug_assert!(self.context.is_empty() && self.answer.is_none());
        self.context = update.context;
    }

    pub(crate) fn apply_generation(&mut self, update: GenerationUpdate) {
        debug_assert!(self.answer.is_none());
        self.answer = Some(update.answer);
    }
}

/// Output of the retrieve step.
#[derive(Debug, Clone)]
pub struct RetrievalUpdate {
    pub context: Vec<Document>,
}

/// Output of the generate step.
#[derive(Debug, Clone)]
pub struct GenerationUpdate {
    pub answer: String,
}

pub struct RagPipeline {
    retriever: Retriever,
    generator: Generator,
}

impl RagPipeline {
    pub fn new(retriever: Retriever, generator: Generator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Assemble the pipeline from explicit collaborators.
    pub fn from_parts(
        config: &AppConfig,
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LLMClient>,
        prompt: Arc<PromptTemplate>,
    ) -> Self {
        let retriever = Retriever::new(
            embeddings,
            store,
            config.vector_store.collection.clone(),
            config.vector_store.top_k,
        )
        .with_score_threshold(config.vector_store.score_threshold);

        Self::new(retriever, Generator::new(llm, prompt))
    }

    /// Build every collaborator from configuration.
    ///
    /// Opens the vector store and loads the prompt template, so this fails
    /// when either is unavailable. Missing API keys only produce a warning.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let llm_key = config.llm_api_key();
        if llm_key.is_none() && config.llm.provider.requires_api_key() {
            tracing::warn!(
                env = %config.llm.api_key_env,
                "Chat model API key not set; generation will fail"
            );
        }
        let provider = Provider::from_config(&config.llm, llm_key);
        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            "Chat model configured"
        );
        let llm: Arc<dyn LLMClient> = Arc::from(provider.create_client()?);

        let embeddings_key = config.embeddings_api_key();
        if embeddings_key.is_none() && config.embeddings.provider.requires_api_key() {
            tracing::warn!(
                env = %config.embeddings.api_key_env,
                "Embedding API key not set; retrieval will fail"
            );
        }
        let embeddings: Arc<dyn EmbeddingClient> = Arc::from(
            EmbeddingProvider::from_config(&config.embeddings, embeddings_key).create_client()?,
        );

        let store: Arc<dyn VectorStore> = Arc::from(
            VectorStoreProvider::from_config(&config.vector_store)?
                .create_store()
                .await?,
        );
        match store.collection_exists(&config.vector_store.collection).await {
            Ok(true) => {
                if let Ok(stats) = store.collection_stats(&config.vector_store.collection).await {
                    tracing::info!(
                        collection = %stats.name,
                        documents = stats.document_count,
                        dimensions = stats.dimensions,
                        "Vector collection ready"
                    );
                }
            }
            Ok(false) => tracing::warn!(
                collection = %config.vector_store.collection,
                "Vector collection not found; answers will have no context until it is ingested"
            ),
            Err(e) => tracing::warn!(error = %e, "Could not inspect vector collection"),
        }

        let hub_key = config.hub_api_key();
        tracing::info!(prompt_hub_key = hub_key.is_some(), "Prompt hub credentials");
        let prompt = Arc::new(PromptTemplate::from_config(&config.prompt, hub_key).await?);

        Ok(Self::from_parts(config, embeddings, store, llm, prompt))
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Run retrieve then generate for one question.
    ///
    /// A retrieval failure returns before the chat model is called.
    #[instrument(name = "rag_pipeline", skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn invoke(&self, question: impl Into<String>) -> Result<PipelineState> {
        let mut state = PipelineState::new(question)?;
        let start = Instant::now();

        let update = self.retriever.retrieve(&state).await.inspect_err(|e| {
            tracing::error!(step = "retrieve", error = %e, "Pipeline step failed");
        })?;
        state.apply_retrieval(update);

        let update = self.generator.generate(&state).await.inspect_err(|e| {
            tracing::error!(step = "generate", error = %e, "Pipeline step failed");
        })?;
        state.apply_generation(update);

        tracing::info!(
            fragments = state.context().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Pipeline complete"
        );
        Ok(state)
    }
}
