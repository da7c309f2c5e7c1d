//! Persistent vector store backed by `ares-vector`.
//!
//! The HNSW index lives in the `ares-vector` data directory, which records the
//! collection layout but not the vectors themselves. Fragments, their
//! metadata and embeddings are kept next to it in `documents.json`, keyed by
//! collection and document id, and replayed into the index on open.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = AresVectorStore::open(Some("./data/vectors".into())).await?;
//! let results = store.search("example_collection", &embedding, 4, None).await?;
//! ```

use crate::types::{AppError, Document, Result, SearchResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::vectorstore::{CollectionStats, VectorStore};
use ares_vector::{Config, DistanceMetric, VectorDb, VectorMetadata};

const DOCUMENTS_FILE: &str = "documents.json";

type DocumentMap = HashMap<String, HashMap<String, Document>>;

pub struct AresVectorStore {
    /// `VectorDb` is cheap to clone and shares its state internally.
    db: VectorDb,
    /// None for in-memory operation
    path: Option<PathBuf>,
    documents: Arc<RwLock<DocumentMap>>,
}

impl AresVectorStore {
    /// Open (or create) a store. `None` keeps everything in memory.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Configuration`] if an existing index or document
    /// file cannot be loaded.
    pub async fn open(path: Option<String>) -> Result<Self> {
        let path_buf = path.map(PathBuf::from);

        let config = match path_buf {
            Some(ref p) => Config::persistent(p.to_string_lossy().to_string()),
            None => Config::memory(),
        };

        let db = VectorDb::open(config).await.map_err(|e| {
            AppError::Configuration(format!("Failed to open vector store: {}", e))
        })?;

        let store = Self {
            db,
            path: path_buf,
            documents: Arc::new(RwLock::new(HashMap::new())),
        };

        if let Some(ref path) = store.path {
            store.load_documents(path).await?;
            store.reindex().await?;
            tracing::info!(
                path = %path.display(),
                collections = ?store.db.list_collections(),
                "Opened persistent vector store"
            );
        }

        Ok(store)
    }

    async fn load_documents(&self, path: &Path) -> Result<()> {
        let docs_path = path.join(DOCUMENTS_FILE);
        if !docs_path.exists() {
            return Ok(());
        }

        let data = tokio::fs::read_to_string(&docs_path).await.map_err(|e| {
            AppError::Configuration(format!("Failed to read {}: {}", docs_path.display(), e))
        })?;

        let loaded: DocumentMap = serde_json::from_str(&data).map_err(|e| {
            AppError::Configuration(format!("Failed to parse {}: {}", docs_path.display(), e))
        })?;

        *self.documents.write() = loaded;
        Ok(())
    }

    /// Insert every stored embedding into the index, creating collections
    /// the index does not know about.
    async fn reindex(&self) -> Result<()> {
        let snapshot: Vec<(String, Vec<Document>)> = {
            let docs = self.documents.read();
            docs.iter()
                .map(|(name, col)| (name.clone(), col.values().cloned().collect()))
                .collect()
        };

        for (collection, documents) in snapshot {
            if !self.db.collection_exists(&collection) {
                let Some(dimensions) = documents
                    .iter()
                    .find_map(|d| d.embedding.as_ref().map(Vec::len))
                else {
                    continue;
                };
                self.db
                    .create_collection(&collection, dimensions, DistanceMetric::Cosine)
                    .await
                    .map_err(|e| {
                        AppError::Configuration(format!(
                            "Failed to restore collection '{}': {}",
                            collection, e
                        ))
                    })?;
            }

            let mut restored = 0usize;
            for doc in &documents {
                let Some(ref embedding) = doc.embedding else {
                    continue;
                };
                self.db
                    .insert(&collection, &doc.id, embedding, Some(metadata_for(doc)))
                    .await
                    .map_err(|e| {
                        AppError::Configuration(format!(
                            "Failed to restore '{}' in '{}': {}",
                            doc.id, collection, e
                        ))
                    })?;
                restored += 1;
            }
            tracing::debug!(collection = %collection, restored, "Rebuilt vector index");
        }

        Ok(())
    }

    /// Write the document file and flush the index.
    async fn persist(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };

        // Serialize before awaiting so the lock is released.
        let data = {
            let docs = self.documents.read();
            serde_json::to_string_pretty(&*docs)
                .map_err(|e| AppError::Internal(format!("Failed to serialize documents: {}", e)))?
        };

        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create data directory: {}", e)))?;
        tokio::fs::write(path.join(DOCUMENTS_FILE), data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write documents file: {}", e)))?;

        self.db
            .persist()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to persist index: {}", e)))
    }
}

fn metadata_for(doc: &Document) -> VectorMetadata {
    VectorMetadata::from_pairs(doc.metadata.iter().map(|(k, v)| (k.clone(), v.clone())))
}

#[async_trait]
impl VectorStore for AresVectorStore {
    fn provider_name(&self) -> &'static str {
        "ares-vector"
    }

    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.db.collection_exists(name) {
            return Err(AppError::Internal(format!(
                "Collection '{}' already exists",
                name
            )));
        }

        self.db
            .create_collection(name, dimensions, DistanceMetric::Cosine)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create collection: {}", e)))?;

        self.documents
            .write()
            .insert(name.to_string(), HashMap::new());

        self.persist().await
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.db.collection_exists(name))
    }

    async fn collection_stats(&self, name: &str) -> Result<CollectionStats> {
        let collection = self
            .db
            .get_collection(name)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let stats = collection.stats();
        Ok(CollectionStats {
            name: stats.name,
            document_count: stats.vector_count,
            dimensions: stats.dimensions,
            distance_metric: format!("{:?}", stats.metric).to_lowercase(),
        })
    }

    async fn upsert(&self, collection: &str, documents: &[Document]) -> Result<usize> {
        if documents.is_empty() {
            return Ok(0);
        }

        if !self.db.collection_exists(collection) {
            return Err(AppError::Internal(format!(
                "Collection '{}' not found",
                collection
            )));
        }

        let mut upserted = 0;
        for doc in documents {
            let embedding = doc.embedding.as_ref().ok_or_else(|| {
                AppError::Internal(format!("Document '{}' is missing embedding", doc.id))
            })?;

            self.db
                .insert(collection, &doc.id, embedding, Some(metadata_for(doc)))
                .await
                .map_err(|e| AppError::Internal(format!("Failed to insert '{}': {}", doc.id, e)))?;

            self.documents
                .write()
                .entry(collection.to_string())
                .or_default()
                .insert(doc.id.clone(), doc.clone());

            upserted += 1;
        }

        self.persist().await?;
        tracing::debug!(collection, upserted, "Upserted documents");
        Ok(upserted)
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        limit: usize,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchResult>> {
        let hits = match threshold {
            Some(min_score) => {
                self.db
                    .search_with_threshold(collection, embedding, limit, min_score)
                    .await
            }
            None => self.db.search(collection, embedding, limit).await,
        }
        .map_err(|e| AppError::RetrievalUnavailable(format!("Vector search failed: {}", e)))?;

        let docs = self.documents.read();
        let collection_docs = docs.get(collection);

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            match collection_docs.and_then(|c| c.get(&hit.id)) {
                Some(doc) => results.push(SearchResult {
                    document: Document {
                        embedding: None,
                        ..doc.clone()
                    },
                    score: hit.score,
                }),
                None => tracing::warn!(
                    collection,
                    id = %hit.id,
                    "Indexed vector has no stored document, skipping"
                ),
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(results)
    }
}
