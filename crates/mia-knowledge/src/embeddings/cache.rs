//! Content-addressed embedding cache using moka
//!
//! Scraped pages are re-ingested whenever a mission revisits a site, so the
//! same chunks are embedded repeatedly. Vectors are cached by the blake3 hash
//! of the chunk text.

use super::Embedder;
use async_trait::async_trait;
use mia_core::EmbeddingError;
use moka::future::Cache;
use std::sync::Arc;

/// Embedder wrapper that memoises vectors per text
#[derive(Debug, Clone)]
pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Cache<[u8; 32], Arc<Vec<f32>>>,
    name: String,
}

impl CachedEmbedder {
    /// Wrap `inner` with a cache of at most `max_capacity` vectors
    #[must_use]
    pub fn new(inner: Arc<dyn Embedder>, max_capacity: u64) -> Self {
        let name = format!("cached:{}", inner.name());
        Self {
            inner,
            cache: Cache::new(max_capacity),
            name,
        }
    }

    /// Number of cached vectors
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Flush pending cache maintenance (insertions become visible to `entry_count`)
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

fn key_for(text: &str) -> [u8; 32] {
    *blake3::hash(text.as_bytes()).as_bytes()
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut slots: Vec<Option<Arc<Vec<f32>>>> = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();

        for (idx, text) in texts.iter().enumerate() {
            let hit = self.cache.get(&key_for(text)).await;
            if hit.is_none() {
                misses.push(idx);
            }
            slots.push(hit);
        }

        if !misses.is_empty() {
            let batch: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed(&batch).await?;
            if vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            for (idx, vector) in misses.into_iter().zip(vectors) {
                let vector = Arc::new(vector);
                self.cache.insert(key_for(&texts[idx]), vector.clone()).await;
                slots[idx] = Some(vector);
            }
        }

        tracing::debug!(
            provider = %self.inner.name(),
            count = texts.len(),
            "Embeddings resolved"
        );

        Ok(slots
            .into_iter()
            .map(|slot| slot.map(|v| v.as_ref().clone()).unwrap_or_default())
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingEmbedder {
        texts_seen: AtomicUsize,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.texts_seen.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn repeated_texts_hit_the_cache() {
        let inner = Arc::new(CountingEmbedder::default());
        let cached = CachedEmbedder::new(inner.clone(), 100);

        let first = cached
            .embed(&["alpha".to_string(), "be".to_string()])
            .await
            .unwrap();
        assert_eq!(first, vec![vec![5.0], vec![2.0]]);

        let second = cached
            .embed(&["be".to_string(), "gamma".to_string(), "alpha".to_string()])
            .await
            .unwrap();
        assert_eq!(second, vec![vec![2.0], vec![5.0], vec![5.0]]);

        // "alpha" and "be" once, "gamma" once
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 3);

        cached.sync().await;
        assert_eq!(cached.entry_count(), 3);
        assert_eq!(cached.name(), "cached:counting");
    }

    #[tokio::test]
    async fn empty_batch_skips_provider() {
        let inner = Arc::new(CountingEmbedder::default());
        let cached = CachedEmbedder::new(inner.clone(), 10);
        assert!(cached.embed(&[]).await.unwrap().is_empty());
        assert_eq!(inner.texts_seen.load(Ordering::SeqCst), 0);
    }
}
