use super::{transport_error, with_retries, LlmClient, RetryPolicy};
use async_trait::async_trait;
use mia_core::prompts::ANALYST_SYSTEM_PROMPT;
use mia_core::LlmError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq client (OpenAI-compatible chat completions)
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    /// Create client; the key is mandatory
    pub fn new(api_key: Option<&str>, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let Some(api_key) = api_key else {
            tracing::error!("GROQ_API_KEY is missing");
            return Err(LlmError::MissingCredentials("GROQ_API_KEY"));
        };

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model,
            api_url: GROQ_CHAT_URL.to_string(),
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    /// Override endpoint
    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Override retry schedule
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn payload(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": ANALYST_SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.1,
            "max_tokens": 2048
        })
    }

    async fn attempt(&self, payload: &serde_json::Value) -> Result<String, LlmError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;
        first_content(completion).ok_or(LlmError::EmptyResponse)
    }
}

fn first_content(completion: ChatCompletion) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .filter(|c| !c.trim().is_empty())
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let payload = self.payload(prompt);
        with_retries(self.retry, "groq", |_| self.attempt(&payload)).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve_canned, CannedResponse};
    use serde_json::json;

    fn completion(content: &str) -> CannedResponse {
        CannedResponse::json(200, json!({"choices": [{"message": {"content": content}}]}))
    }

    fn client() -> GroqClient {
        GroqClient::new(Some("k"), "llama-3.3-70b-versatile".to_string(), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn payload_carries_system_prompt_and_limits() {
        let payload = client().payload("hello");
        assert_eq!(payload["messages"][0]["content"], ANALYST_SYSTEM_PROMPT);
        assert_eq!(payload["messages"][1]["content"], "hello");
        assert_eq!(payload["max_tokens"], 2048);
        assert_eq!(payload["model"], "llama-3.3-70b-versatile");
    }

    #[test]
    fn first_content_extraction() {
        let completion: ChatCompletion =
            serde_json::from_value(json!({"choices": [{"message": {"content": "# Report"}}]}))
                .unwrap();
        assert_eq!(first_content(completion).as_deref(), Some("# Report"));

        let empty: ChatCompletion = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(first_content(empty), None);

        let blank: ChatCompletion =
            serde_json::from_value(json!({"choices": [{"message": {"content": "  "}}]})).unwrap();
        assert_eq!(first_content(blank), None);
    }

    #[tokio::test]
    async fn attempt_maps_provider_statuses() {
        let stub = serve_canned(vec![
            CannedResponse::json(429, json!({"error": {"message": "rate limited"}})),
            CannedResponse::json(401, json!({"error": {"message": "invalid api key"}})),
            completion("# Report"),
        ])
        .await;
        let client = client().with_api_url(format!("{}/v1/chat/completions", stub.base_url));
        let payload = client.payload("hi");

        assert!(matches!(client.attempt(&payload).await, Err(LlmError::RateLimited)));
        match client.attempt(&payload).await {
            Err(LlmError::Http { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(client.attempt(&payload).await.unwrap(), "# Report");
        assert_eq!(stub.hits(), 3);
    }

    #[tokio::test]
    async fn generate_retries_through_rate_limit() {
        let stub = serve_canned(vec![
            CannedResponse::json(429, json!({})),
            CannedResponse::json(429, json!({})),
            completion("# Report"),
        ])
        .await;
        let client = client()
            .with_api_url(stub.base_url.clone())
            .with_retry(RetryPolicy::immediate(3));
        assert_eq!(client.generate("hi").await.unwrap(), "# Report");
        assert_eq!(stub.hits(), 3);
    }

    #[tokio::test]
    async fn persistent_rate_limit_exhausts_retries() {
        let stub = serve_canned(vec![CannedResponse::json(429, json!({})); 3]).await;
        let client = client()
            .with_api_url(stub.base_url.clone())
            .with_retry(RetryPolicy::immediate(3));
        assert!(matches!(
            client.generate("hi").await,
            Err(LlmError::RetriesExhausted(3))
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_surfaces_transport_error() {
        let client = client()
            .with_api_url("http://127.0.0.1:1/v1/chat/completions")
            .with_retry(RetryPolicy::immediate(2));
        let err = client.generate("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(_) | LlmError::Timeout { .. }));
    }
}
