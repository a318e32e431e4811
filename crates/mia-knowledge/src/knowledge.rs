//! Document ingestion and semantic search

use crate::chunking::{chunk_text, DEFAULT_CHUNK_CHARS};
use crate::embeddings::Embedder;
use crate::store::{ChunkMetadata, StoredRecord, VectorStore};
use chrono::Utc;
use mia_core::{EmbeddingError, StoreError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

/// Collection holding scraped pages and reports
pub const DEFAULT_COLLECTION: &str = "market_intel";

/// Search result returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    pub text: String,
    pub conversation_id: i64,
    pub score: f32,
}

/// Mission memory: chunk, embed, store, retrieve
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    chunk_chars: usize,
}

impl KnowledgeBase {
    /// Create knowledge base over `store` using the default collection
    #[must_use]
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            collection: DEFAULT_COLLECTION.to_string(),
            chunk_chars: DEFAULT_CHUNK_CHARS,
        }
    }

    /// With maximum chunk length
    #[must_use]
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Chunk, embed and persist a document; returns the number of stored chunks
    pub async fn ingest_document(
        &self,
        title: &str,
        content: &str,
        conversation_id: i64,
    ) -> Result<usize, StoreError> {
        let chunks = chunk_text(content, self.chunk_chars);
        if chunks.is_empty() {
            tracing::debug!(title, "Nothing to ingest");
            return Ok(0);
        }

        let vectors = self.embedder.embed(&chunks).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunks.len(),
                actual: vectors.len(),
            }
            .into());
        }

        let created_at = Utc::now();
        let records: Vec<StoredRecord> = chunks
            .into_iter()
            .zip(vectors)
            .enumerate()
            .map(|(chunk_index, (text, embedding))| StoredRecord {
                id: Ulid::new().to_string(),
                text,
                embedding,
                metadata: ChunkMetadata {
                    title: title.to_string(),
                    conversation_id,
                    chunk_index,
                    created_at,
                },
            })
            .collect();

        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        let stored = tokio::task::spawn_blocking(move || store.add(&collection, records))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))??;

        tracing::info!(title, chunks = stored, conversation_id, "Document ingested");
        Ok(stored)
    }

    /// Most similar chunks to `query`
    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        conversation_id: Option<i64>,
    ) -> Result<Vec<SearchHit>, StoreError> {
        if query.trim().is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let Some(embedding) = vectors.pop() else {
            return Ok(Vec::new());
        };

        let store = Arc::clone(&self.store);
        let collection = self.collection.clone();
        let scored = tokio::task::spawn_blocking(move || {
            store.query(&collection, &embedding, top_k, conversation_id)
        })
        .await
        .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))??;

        let hits = scored
            .into_iter()
            .map(|scored| SearchHit {
                id: scored.record.id,
                title: scored.record.metadata.title,
                text: scored.record.text,
                conversation_id: scored.record.metadata.conversation_id,
                score: scored.score,
            })
            .collect();
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::LocalEmbedder;
    use tempfile::TempDir;

    fn knowledge(tmp: &TempDir) -> KnowledgeBase {
        let store = Arc::new(VectorStore::open(tmp.path()).unwrap());
        KnowledgeBase::new(store, Arc::new(LocalEmbedder::new(128))).with_chunk_chars(80)
    }

    #[tokio::test]
    async fn ingest_then_search_finds_relevant_chunk() {
        let tmp = TempDir::new().unwrap();
        let kb = knowledge(&tmp);

        let stored = kb
            .ingest_document(
                "Scrape: https://lambdalabs.com",
                "Lambda GPU cloud: H100 SXM costs $2.49 per hour.\n\
                 A100 instances cost $1.29 per hour.",
                12,
            )
            .await
            .unwrap();
        assert!(stored >= 1);

        kb.ingest_document("Recipe", "Slow roasted tomatoes with basil and garlic.", 3)
            .await
            .unwrap();

        let hits = kb.search("H100 per hour cost", 1, None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Scrape: https://lambdalabs.com");
        assert_eq!(hits[0].conversation_id, 12);

        let scoped = kb.search("H100 per hour cost", 5, Some(3)).await.unwrap();
        assert!(scoped.iter().all(|h| h.conversation_id == 3));
    }

    #[tokio::test]
    async fn empty_document_stores_nothing() {
        let tmp = TempDir::new().unwrap();
        let kb = knowledge(&tmp);
        assert_eq!(kb.ingest_document("Empty", "  \n ", 1).await.unwrap(), 0);
        assert_eq!(kb.store().count(DEFAULT_COLLECTION), 0);
    }

    #[tokio::test]
    async fn blank_query_returns_nothing() {
        let tmp = TempDir::new().unwrap();
        let kb = knowledge(&tmp);
        assert!(kb.search("   ", 3, None).await.unwrap().is_empty());
    }
}
