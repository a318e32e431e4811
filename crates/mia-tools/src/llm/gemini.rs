use super::{transport_error, with_retries, LlmClient, RetryPolicy};
use async_trait::async_trait;
use mia_core::prompts::ANALYST_SYSTEM_PROMPT;
use mia_core::LlmError;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini client (`generateContent`)
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// Create client; the key is mandatory
    pub fn new(api_key: Option<&str>, model: String, timeout: Duration) -> Result<Self, LlmError> {
        let Some(api_key) = api_key else {
            tracing::error!("GEMINI_API_KEY is missing");
            return Err(LlmError::MissingCredentials("GEMINI_API_KEY"));
        };

        Ok(Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            model,
            base_url: GEMINI_API_BASE.to_string(),
            timeout,
            retry: RetryPolicy::default(),
        })
    }

    /// Override API base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override retry schedule
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn payload(prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": ANALYST_SYSTEM_PROMPT }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.1, "maxOutputTokens": 2048 }
        })
    }

    async fn attempt(&self, payload: &serde_json::Value) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
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

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;
        candidate_text(body).ok_or(LlmError::EmptyResponse)
    }
}

/// Concatenated text parts of the first candidate
fn candidate_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let payload = Self::payload(prompt);
        with_retries(self.retry, "gemini", |_| self.attempt(&payload)).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
