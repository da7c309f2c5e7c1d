//! Persistent vector store behaviour across restarts.

#![cfg(feature = "ares-vector")]

use study_rag::{
    db::{AresVectorStore, VectorStore, VectorStoreProvider},
    types::Document,
    utils::toml_config::{VectorStoreConfig, VectorStoreKind},
};
use tempfile::TempDir;

const COLLECTION: &str = "example_collection";

fn fragment(id: &str, content: &str, embedding: Vec<f32>) -> Document {
    Document::new(id, content)
        .with_embedding(embedding)
        .with_metadata("source", "tests")
}

async fn open(dir: &TempDir) -> AresVectorStore {
    AresVectorStore::open(Some(dir.path().to_string_lossy().to_string()))
        .await
        .expect("open store")
}

#[tokio::test]
async fn test_documents_survive_reopen() {
    let dir = TempDir::new().unwrap();

    {
        let store = open(&dir).await;
        store.create_collection(COLLECTION, 3).await.unwrap();
        store
            .upsert(
                COLLECTION,
                &[
                    fragment("paris", "Paris is the capital of France.", vec![1.0, 0.0, 0.0]),
                    fragment("berlin", "Berlin is the capital of Germany.", vec![0.0, 1.0, 0.0]),
                ],
            )
            .await
            .unwrap();
    }

    let store = open(&dir).await;
    assert!(store.collection_exists(COLLECTION).await.unwrap());

    let results = store
        .search(COLLECTION, &[0.9, 0.1, 0.0], 1, None)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.id, "paris");
    assert_eq!(results[0].document.content, "Paris is the capital of France.");
    assert_eq!(
        results[0].document.metadata.get("source").map(String::as_str),
        Some("tests")
    );
    assert!(results[0].document.embedding.is_none());
}

#[tokio::test]
async fn test_upsert_replaces_existing_fragment() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;
    store.create_collection(COLLECTION, 3).await.unwrap();

    store
        .upsert(COLLECTION, &[fragment("doc", "old text", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();
    store
        .upsert(COLLECTION, &[fragment("doc", "new text", vec![1.0, 0.0, 0.0])])
        .await
        .unwrap();

    let results = store
        .search(COLLECTION, &[1.0, 0.0, 0.0], 4, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document.content, "new text");
}

#[tokio::test]
async fn test_empty_directory_has_no_collection() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    assert!(!store.collection_exists(COLLECTION).await.unwrap());
    assert_eq!(store.provider_name(), "ares-vector");
}

#[tokio::test]
async fn test_provider_opens_configured_path() {
    let dir = TempDir::new().unwrap();
    let config = VectorStoreConfig {
        provider: VectorStoreKind::AresVector,
        path: dir.path().join("vectors").to_string_lossy().to_string(),
        ..VectorStoreConfig::default()
    };

    let store = VectorStoreProvider::from_config(&config)
        .unwrap()
        .create_store()
        .await
        .unwrap();

    assert_eq!(store.provider_name(), "ares-vector");
    store.create_collection(COLLECTION, 2).await.unwrap();
    assert!(dir.path().join("vectors").exists());
}
