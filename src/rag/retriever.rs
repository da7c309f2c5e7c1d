use crate::db::VectorStore;
use crate::rag::embeddings::EmbeddingClient;
use crate::rag::pipeline::{PipelineState, RetrievalUpdate};
use crate::types::{AppError, Result};
use std::sync::Arc;
use std::time::Instant;

/// Any failure on the retrieval path is reported as the index being unavailable.
fn retrieval_error(err: AppError) -> AppError {
    match err {
        AppError::RetrievalUnavailable(_) => err,
        other => AppError::RetrievalUnavailable(other.to_string()),
    }
}

/// Embeds the question and pulls the nearest fragments from one collection.
pub struct Retriever {
    embeddings: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
    score_threshold: Option<f32>,
}

impl Retriever {
    pub fn new(
        embeddings: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embeddings,
            store,
            collection: collection.into(),
            top_k,
            score_threshold: None,
        }
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store_name(&self) -> &'static str {
        self.store.provider_name()
    }

    pub fn embedding_model(&self) -> &str {
        self.embeddings.model_name()
    }

    /// Fetch up to `top_k` fragments for the state's question, in store order.
    ///
    /// A collection that has not been created yet yields an empty context.
    pub async fn retrieve(&self, state: &PipelineState) -> Result<RetrievalUpdate> {
        let start = Instant::now();

        if !self
            .store
            .collection_exists(&self.collection)
            .await
            .map_err(retrieval_error)?
        {
            tracing::warn!(
                collection = %self.collection,
                "Collection does not exist, answering without context"
            );
            return Ok(RetrievalUpdate {
                context: Vec::new(),
            });
        }

        let embedding = self
            .embeddings
            .embed_query(state.question())
            .await
            .map_err(retrieval_error)?;

        let results = self
            .store
            .search(
                &self.collection,
                &embedding,
                self.top_k,
                self.score_threshold,
            )
            .await
            .map_err(retrieval_error)?;

        tracing::info!(
            collection = %self.collection,
            fragments = results.len(),
            top_score = results.first().map(|r| r.score),
            duration_ms = start.elapsed().as_millis() as u64,
            "Retrieved context"
        );

        Ok(RetrievalUpdate {
            context: results.into_iter().map(|r| r.document).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryVectorStore;
    use crate::types::Document;
    use async_trait::async_trait;

    struct FixedEmbedding(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedding {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.0.clone())
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    struct BrokenEmbedding;

    #[async_trait]
    impl EmbeddingClient for BrokenEmbedding {
        async fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AppError::Internal("quota exceeded".to_string()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    async fn store_with(docs: &[(&str, &str, Vec<f32>)]) -> Arc<dyn VectorStore> {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        let docs: Vec<Document> = docs
            .iter()
            .map(|(id, content, e)| Document::new(*id, *content).with_embedding(e.clone()))
            .collect();
        store.upsert("docs", &docs).await.unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_retrieve_top_k_in_score_order() {
        let store = store_with(&[
            ("a", "A", vec![1.0, 0.0]),
            ("b", "B", vec![0.8, 0.2]),
            ("c", "C", vec![0.0, 1.0]),
        ])
        .await;
        let retriever = Retriever::new(Arc::new(FixedEmbedding(vec![1.0, 0.0])), store, "docs", 2);

        let state = PipelineState::new("q").unwrap();
        let update = retriever.retrieve(&state).await.unwrap();

        let contents: Vec<&str> = update.context.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_missing_collection_gives_empty_context() {
        let retriever = Retriever::new(
            Arc::new(BrokenEmbedding),
            Arc::new(InMemoryVectorStore::new()),
            "absent",
            4,
        );
        let state = PipelineState::new("q").unwrap();
        let update = retriever.retrieve(&state).await.unwrap();
        assert!(update.context.is_empty());
    }

    #[tokio::test]
    async fn test_embedding_failure_is_retrieval_unavailable() {
        let store = store_with(&[("a", "A", vec![1.0, 0.0])]).await;
        let retriever = Retriever::new(Arc::new(BrokenEmbedding), store, "docs", 4);

        let state = PipelineState::new("q").unwrap();
        let err = retriever.retrieve(&state).await.unwrap_err();
        assert!(matches!(err, AppError::RetrievalUnavailable(_)));
    }

    #[tokio::test]
    async fn test_score_threshold_filters() {
        let store = store_with(&[("a", "A", vec![1.0, 0.0]), ("c", "C", vec![0.0, 1.0])]).await;
        let retriever = Retriever::new(Arc::new(FixedEmbedding(vec![1.0, 0.0])), store, "docs", 4)
            .with_score_threshold(Some(0.5));

        let state = PipelineState::new("q").unwrap();
        let update = retriever.retrieve(&state).await.unwrap();
        assert_eq!(update.context.len(), 1);
    }
}
