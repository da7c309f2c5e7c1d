//! Vector Store Abstraction Layer
//!
//! The retriever only ever talks to a [`VectorStore`]. Two backends exist:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               VectorStore Trait               │
//! ├──────────────────────────────────────────────┤
//! │  collection_exists │ search │ upsert │ stats │
//! └──────────────────────────────────────────────┘
//!           ▲                         ▲
//!    ┌──────┴──────┐           ┌──────┴──────┐
//!    │ AresVector  │           │  InMemory   │
//!    │ (persisted) │           │  (volatile) │
//!    └─────────────┘           └─────────────┘
//! ```
//!
//! Documents are written by an external ingestion step; `upsert` exists so
//! that step (and the tests) can populate a collection through the same type.

use crate::types::{AppError, Document, Result, SearchResult};
use crate::utils::toml_config::{VectorStoreConfig, VectorStoreKind};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Vector Store Provider Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub enum VectorStoreProvider {
    /// Embedded HNSW index persisted under `path`.
    #[cfg(feature = "ares-vector")]
    AresVector { path: String },

    /// Data is lost when the process exits.
    InMemory,
}

impl VectorStoreProvider {
    /// Select the backend named by the `[vector_store]` section.
    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        match config.provider {
            #[cfg(feature = "ares-vector")]
            VectorStoreKind::AresVector => Ok(VectorStoreProvider::AresVector {
                path: config.path.clone(),
            }),

            #[cfg(not(feature = "ares-vector"))]
            VectorStoreKind::AresVector => Err(AppError::Configuration(
                "ares-vector store not enabled. Rebuild with the `ares-vector` feature."
                    .to_string(),
            )),

            VectorStoreKind::Memory => Ok(VectorStoreProvider::InMemory),
        }
    }

    /// Open the store.
    ///
    /// # Errors
    ///
    /// Returns an error if a persisted index exists but cannot be loaded.
    pub async fn create_store(&self) -> Result<Box<dyn VectorStore>> {
        match self {
            #[cfg(feature = "ares-vector")]
            VectorStoreProvider::AresVector { path } => {
                let store = super::ares_vector::AresVectorStore::open(Some(path.clone())).await?;
                Ok(Box::new(store))
            }

            VectorStoreProvider::InMemory => Ok(Box::new(InMemoryVectorStore::new())),
        }
    }
}

// ============================================================================
// Collection Statistics
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionStats {
    pub name: String,
    pub document_count: usize,
    pub dimensions: usize,
    /// Distance metric used (e.g., "cosine").
    pub distance_metric: String,
}

// ============================================================================
// Vector Store Trait
// ============================================================================

/// Similarity search over previously indexed fragments.
///
/// # Implementors
///
/// - `AresVectorStore` - persistent HNSW index (default)
/// - `InMemoryVectorStore` - brute-force cosine search, tests and demos
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this vector store provider.
    fn provider_name(&self) -> &'static str;

    /// Create a new collection with the specified vector dimensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats>;

    /// Upsert documents with their embeddings into a collection.
    ///
    /// Documents are identified by `id`; an existing entry is replaced.
    /// Every document must carry an embedding.
    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize>;

    /// Search for the `limit` nearest fragments.
    ///
    /// Results are ordered by descending similarity. When `threshold` is set,
    /// hits scoring below it are dropped.
    ///
    /// # Errors
    ///
    /// Fails with [`AppError::RetrievalUnavailable`] when the collection is
    /// missing, the query dimension does not match, or the index cannot be read.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>>;
}

// ============================================================================
// In-Memory Vector Store
// ============================================================================

/// Brute-force cosine similarity over a map of documents.
pub struct InMemoryVectorStore {
    collections: Arc<RwLock<HashMap<String, InMemoryCollection>>>,
}

struct InMemoryCollection {
    dimensions: usize,
    documents: HashMap<String, Document>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Err(AppError::Internal(format!(
                "Collection '{}' already exists",
                name
            )));
        }
        collections.insert(
            name.to_string(),
            InMemoryCollection {
                dimensions,
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let collections = self.collections.read();
        let col = collections
            .get(name)
            .ok_or_else(|| AppError::Internal(format!("Collection '{}' not found", name)))?;

        Ok(CollectionStats {
            name: name.to_string(),
            document_count: col.documents.len(),
            dimensions: col.dimensions,
            distance_metric: "cosine".to_string(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        let mut collections = self.collections.write();
        let col = collections.get_mut(collection).ok_or_else(|| {
            AppError::Internal(format!("Collection '{}' not found", collection))
        })?;

        let mut count = 0;
        for doc in documents {
            let embedding = doc.embedding.as_ref().ok_or_else(|| {
                AppError::Internal(format!("Document '{}' is missing embedding", doc.id))
            })?;
            if embedding.len() != col.dimensions {
                return Err(AppError::Internal(format!(
                    "Document '{}' has {} dimensions, collection expects {}",
                    doc.id,
                    embedding.len(),
                    col.dimensions
                )));
            }
            col.documents.insert(doc.id.clone(), doc.clone());
            count += 1;
        }

        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read();
        let col = collections.get(collection).ok_or_else(|| {
            AppError::RetrievalUnavailable(format!("Collection '{}' not found", collection))
        })?;

        if embedding.len() != col.dimensions {
            return Err(AppError::RetrievalUnavailable(format!(
                "Dimension mismatch: expected {}, got {}",
                col.dimensions,
                embedding.len()
            )));
        }

        let min_score = threshold.unwrap_or(f32::NEG_INFINITY);
        let mut results: Vec<SearchResult> = col
            .documents
            .values()
            .filter_map(|doc| {
                let doc_embedding = doc.embedding.as_ref()?;
                let score = Self::cosine_similarity(embedding, doc_embedding);
                if score >= min_score {
                    Some(SearchResult {
                        document: Document {
                            id: doc.id.clone(),
                            content: doc.content.clone(),
                            metadata: doc.metadata.clone(),
                            embedding: None,
                        },
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }
}

// ============================================================================
// Tests
// ============================================================================
