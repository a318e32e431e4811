use super::{vectors_from_value, Embedder};
use async_trait::async_trait;
use mia_core::EmbeddingError;
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// HuggingFace Inference API embedder (feature-extraction pipeline)
///
/// Public models work without a token. A 503 means the model is still
/// loading; the request is retried with a growing wait.
#[derive(Debug, Clone)]
pub struct HuggingFaceEmbedder {
    client: Client,
    url: String,
    token: Option<String>,
    max_attempts: u32,
    warmup_wait: Duration,
    error_wait: Duration,
    transport_wait: Duration,
}

impl HuggingFaceEmbedder {
    /// Create embedder for `url`
    #[must_use]
    pub fn new(url: String, token: Option<String>) -> Self {
        if token.is_some() {
            tracing::info!(%url, "HuggingFace embedder initialized");
        } else {
            tracing::warn!(
                %url,
                "HuggingFace embedder initialized without token (public models only)"
            );
        }

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            url,
            token,
            max_attempts: 3,
            warmup_wait: Duration::from_secs(15),
            error_wait: Duration::from_secs(5),
            transport_wait: Duration::from_secs(2),
        }
    }

    /// Override retry waits
    #[must_use]
    pub fn with_waits(mut self, warmup: Duration, error: Duration, transport: Duration) -> Self {
        self.warmup_wait = warmup;
        self.error_wait = error;
        self.transport_wait = transport;
        self
    }

    async fn attempt(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "inputs": texts }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidPayload(e.to_string()))?;
        vectors_from_value(payload)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(chunks = texts.len(), "Requesting vectors from HuggingFace");

        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            let is_last = attempt + 1 == self.max_attempts;
            match self.attempt(texts).await {
                Ok(vectors) => {
                    tracing::info!(count = vectors.len(), "Received vectors from HuggingFace");
                    return Ok(vectors);
                }
                Err(EmbeddingError::Http { status, message })
                    if status == StatusCode::SERVICE_UNAVAILABLE.as_u16() =>
                {
                    let wait = self.warmup_wait * (attempt + 1);
                    tracing::warn!(?wait, "HF embedding model warming up");
                    last_error = Some(EmbeddingError::Http { status, message });
                    if !is_last {
                        tokio::time::sleep(wait).await;
                    }
                }
                Err(e @ EmbeddingError::Http { .. }) => {
                    tracing::error!(error = %e, "HuggingFace embedding HTTP error");
                    if is_last {
                        return Err(e);
                    }
                    last_error = Some(e);
                    tokio::time::sleep(self.error_wait).await;
                }
                Err(e @ EmbeddingError::Transport(_)) => {
                    tracing::error!(error = %e, "HuggingFace embedding error");
                    if is_last {
                        return Err(e);
                    }
                    last_error = Some(e);
                    tokio::time::sleep(self.transport_wait).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "HuggingFace returned invalid embedding format");
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or(EmbeddingError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            message: "model did not warm up".to_string(),
        }))
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_json;
    use serde_json::json;
    use std::time::Instant;

    const STEP: Duration = Duration::from_millis(40);

    fn texts() -> Vec<String> {
        vec!["H100 pricing".to_string()]
    }

    #[tokio::test]
    async fn empty_input_skips_request() {
        // Unroutable URL: any request would fail.
        let embedder = HuggingFaceEmbedder::new("http://127.0.0.1:1/".to_string(), None);
        assert!(embedder.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn warming_model_wait_grows_per_attempt() {
        let stub = serve_json(vec![
            (503, json!({"error": "Model is currently loading"})),
            (503, json!({"error": "Model is currently loading"})),
            (200, json!([[0.25, 0.5, 0.75]])),
        ])
        .await;
        let embedder = HuggingFaceEmbedder::new(stub.url.clone(), Some("hf_token".to_string()))
            .with_waits(STEP, Duration::ZERO, Duration::ZERO);

        let started = Instant::now();
        let vectors = embedder.embed(&texts()).await.unwrap();

        assert_eq!(vectors, vec![vec![0.25, 0.5, 0.75]]);
        assert_eq!(stub.hits(), 3);
        // STEP after the first 503, 2 * STEP after the second
        assert!(started.elapsed() >= STEP * 3);
    }

    #[tokio::test]
    async fn warming_model_that_never_loads_is_503() {
        let loading = (503, json!({"error": "Model is currently loading"}));
        let stub = serve_json(vec![loading.clone(), loading.clone(), loading]).await;
        let embedder = HuggingFaceEmbedder::new(stub.url.clone(), None)
            .with_waits(Duration::ZERO, Duration::ZERO, Duration::ZERO);

        let err = embedder.embed(&texts()).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Http { status: 503, .. }));
        assert_eq!(stub.hits(), 3);
    }

    #[tokio::test]
    async fn other_http_errors_wait_fixed_interval() {
        let stub = serve_json(vec![
            (500, json!({"error": "internal"})),
            (200, json!([[1.0, 0.0]])),
        ])
        .await;
        let embedder = HuggingFaceEmbedder::new(stub.url.clone(), None)
            .with_waits(Duration::ZERO, STEP, Duration::ZERO);

        let started = Instant::now();
        let vectors = embedder.embed(&texts()).await.unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0]]);
        assert_eq!(stub.hits(), 2);
        assert!(started.elapsed() >= STEP);
    }

    #[tokio::test]
    async fn non_list_payload_is_rejected_without_retry() {
        let stub = serve_json(vec![(200, json!({"error": "unexpected"}))]).await;
        let embedder = HuggingFaceEmbedder::new(stub.url.clone(), None)
            .with_waits(Duration::ZERO, Duration::ZERO, Duration::ZERO);

        let err = embedder.embed(&texts()).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidPayload(_)));
        assert_eq!(stub.hits(), 1);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_after_retries() {
        let embedder = HuggingFaceEmbedder::new("http://127.0.0.1:1/".to_string(), None)
            .with_waits(Duration::ZERO, Duration::ZERO, Duration::ZERO);
        let err = embedder.embed(&["hello".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Transport(_)));
    }
}
