//! MIA Knowledge - long-term mission memory
//!
//! Persists scraped pages and synthesised reports as embedded chunks in a
//! directory-backed vector store, and retrieves them by semantic similarity.
//!
//! - [`embeddings`]: remote and offline embedders plus a content-hash cache
//! - [`store`]: collections persisted as JSON files under one directory
//! - [`chunking`]: paragraph-aware splitting of long documents
//! - [`knowledge`]: ingestion and search over the store

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod chunking;
pub mod embeddings;
pub mod knowledge;
pub mod store;

#[cfg(test)]
mod test_support;

pub use chunking::{chunk_text, DEFAULT_CHUNK_CHARS};
pub use embeddings::{
    embedder_from_settings, CachedEmbedder, Embedder, GeminiEmbedder, HuggingFaceEmbedder,
    LocalEmbedder,
};
pub use knowledge::{KnowledgeBase, SearchHit, DEFAULT_COLLECTION};
pub use store::{ChunkMetadata, ScoredRecord, StoredRecord, VectorStore};
