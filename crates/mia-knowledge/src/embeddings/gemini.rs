use super::Embedder;
use async_trait::async_trait;
use mia_core::EmbeddingError;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_EMBED_MODEL: &str = "text-embedding-004";

/// Google Gemini `text-embedding-004` embedder (768 dims)
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Option<Vec<f32>>,
}

impl GeminiEmbedder {
    /// Create embedder; the key is mandatory
    pub fn new(api_key: Option<&str>) -> Result<Self, EmbeddingError> {
        let Some(api_key) = api_key else {
            tracing::error!("GEMINI_API_KEY is missing for embeddings");
            return Err(EmbeddingError::MissingCredentials("GEMINI_API_KEY"));
        };

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            model: GEMINI_EMBED_MODEL.to_string(),
        })
    }

    /// Override API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(&self, texts: &[String]) -> serde_json::Value {
        let model = format!("models/{}", self.model);
        let requests: Vec<_> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] }
                })
            })
            .collect();
        serde_json::json!({ "requests": requests })
    }
}

/// Keep only embeddings that carry values
fn vectors_from_response(response: BatchEmbedResponse) -> Vec<Vec<f32>> {
    response
        .embeddings
        .into_iter()
        .filter_map(|e| e.values)
        .collect()
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(chunks = texts.len(), "Requesting 768-dim vectors from Gemini");

        let url = format!(
            "{}/models/{}:batchEmbedContents",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(texts))
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Gemini embedding error");
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: BatchEmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidPayload(e.to_string()))?;
        let vectors = vectors_from_response(body);
        if vectors.is_empty() {
            tracing::error!("Gemini returned an empty embedding result");
            return Err(EmbeddingError::InvalidPayload("no embeddings".to_string()));
        }

        tracing::info!(count = vectors.len(), "Received vectors from Gemini");
        Ok(vectors)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
