//! Vector stores.
//!
//! - `ares-vector` (default feature) - embedded HNSW index persisted on disk
//! - in-memory - brute-force cosine search, always available
//!
//! Enable the persistent backend via Cargo features:
//! ```toml
//! study-rag-server = { version = "*", features = ["ares-vector"] }
//! ```

pub mod vectorstore;

#[cfg(feature = "ares-vector")]
pub mod ares_vector;

pub use vectorstore::{CollectionStats, InMemoryVectorStore, VectorStore, VectorStoreProvider};

#[cfg(feature = "ares-vector")]
pub use ares_vector::AresVectorStore;
