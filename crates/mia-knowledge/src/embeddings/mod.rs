//! Text embedders
//!
//! Providers are selected from settings:
//! - `gemini`: Google `text-embedding-004` (768 dims)
//! - `local` / `sentence_transformers` / `sentence-transformers`: offline hashing embedder
//! - anything else: HuggingFace Inference API (all-MiniLM-L6-v2, 384 dims)
//!
//! Every provider is wrapped in a [`CachedEmbedder`].

mod cache;
mod gemini;
mod huggingface;
mod local;

pub use cache::CachedEmbedder;
pub use gemini::GeminiEmbedder;
pub use huggingface::HuggingFaceEmbedder;
pub use local::LocalEmbedder;

use async_trait::async_trait;
use mia_core::{EmbeddingError, Settings};
use std::sync::Arc;

/// Default cache capacity (number of distinct texts)
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Converts texts into vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts; an empty batch yields an empty result
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// Build the configured embedder
pub fn embedder_from_settings(settings: &Settings) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    let provider = settings.embedding_provider.to_lowercase();
    let inner: Arc<dyn Embedder> = match provider.as_str() {
        "gemini" => Arc::new(GeminiEmbedder::new(settings.gemini_key())?),
        "local" | "sentence_transformers" | "sentence-transformers" => {
            Arc::new(LocalEmbedder::new(settings.local_embed_dim))
        }
        _ => Arc::new(HuggingFaceEmbedder::new(
            settings.hf_embed_url.clone(),
            settings.hf_token().map(str::to_string),
        )),
    };

    tracing::info!(provider = inner.name(), "Embedding provider selected");
    Ok(Arc::new(CachedEmbedder::new(inner, DEFAULT_CACHE_CAPACITY)))
}

/// Interpret a JSON payload as a list of float vectors
pub(crate) fn vectors_from_value(
    value: serde_json::Value,
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let rows = match value {
        serde_json::Value::Array(rows) if !rows.is_empty() => rows,
        other => {
            return Err(EmbeddingError::InvalidPayload(format!(
                "expected non-empty list, got {}",
                kind_of(&other)
            )))
        }
    };

    rows.into_iter()
        .map(|row| {
            serde_json::from_value::<Vec<f32>>(row)
                .map_err(|e| EmbeddingError::InvalidPayload(e.to_string()))
        })
        .collect()
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "empty list",
        serde_json::Value::Object(_) => "object",
    }
}
