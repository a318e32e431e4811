//! Chat-completion clients
//!
//! Providers share one retry loop ([`RetryPolicy`]):
//! - rate limits (429) wait `rate_limit_step * attempt` and never fail early
//! - other retryable errors wait `backoff` and surface on the last attempt
//! - missing credentials fail immediately

mod gemini;
mod groq;

pub use gemini::GeminiClient;
pub use groq::GroqClient;

use async_trait::async_trait;
use mia_core::{LlmError, LlmProvider, Settings};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Text generation backend
#[async_trait]
pub trait LlmClient: Send + Sync + std::fmt::Debug {
    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier for logs
    fn model(&self) -> &str;
}

/// Retry schedule for LLM requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
    pub rate_limit_step: Duration,
}

impl RetryPolicy {
    /// No waiting between attempts
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
            rate_limit_step: Duration::ZERO,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
            rate_limit_step: Duration::from_secs(2),
        }
    }
}

/// Run `attempt` under `policy`
pub(crate) async fn with_retries<F, Fut>(
    policy: RetryPolicy,
    provider: &str,
    mut attempt: F,
) -> Result<String, LlmError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<String, LlmError>>,
{
    for n in 0..policy.max_attempts {
        let is_last = n + 1 == policy.max_attempts;
        tracing::info!(provider, attempt = n + 1, "LLM request");

        match attempt(n).await {
            Ok(content) => {
                tracing::info!(provider, "LLM response received");
                return Ok(content);
            }
            Err(LlmError::RateLimited) => {
                let wait = policy.rate_limit_step * (n + 1);
                tracing::warn!(provider, ?wait, "Rate limit hit");
                tokio::time::sleep(wait).await;
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if is_last {
                    tracing::error!(provider, error = %e, "LLM final failure");
                    return Err(e);
                }
                tracing::warn!(provider, error = %e, "LLM attempt failed, retrying");
                tokio::time::sleep(policy.backoff).await;
            }
        }
    }

    Err(LlmError::RetriesExhausted(policy.max_attempts))
}

/// Map a reqwest failure to an [`LlmError`]
pub(crate) fn transport_error(err: &reqwest::Error, timeout: Duration) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        LlmError::Transport(err.to_string())
    }
}

/// Build the configured LLM client
pub fn llm_from_settings(settings: &Settings) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match settings.llm_provider {
        LlmProvider::Groq => Arc::new(GroqClient::new(
            settings.groq_key(),
            settings.groq_model_name.clone(),
            settings.llm_timeout(),
        )?),
        LlmProvider::Gemini => Arc::new(GeminiClient::new(
            settings.gemini_key(),
            settings.gemini_model_name.clone(),
            settings.llm_timeout(),
        )?),
    };
    tracing::info!(model = client.model(), "LLM client initialized");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retries(RetryPolicy::immediate(3), "test", |n| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::Transport("reset".to_string()))
                } else {
                    Ok("report".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "report");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn last_error_surfaces() {
        let result = with_retries(RetryPolicy::immediate(2), "test", |_| async {
            Err::<String, _>(LlmError::Timeout { secs: 60 })
        })
        .await;
        assert!(matches!(result, Err(LlmError::Timeout { secs: 60 })));
    }

    #[tokio::test]
    async fn rate_limits_exhaust_retries() {
        let result = with_retries(RetryPolicy::immediate(3), "test", |_| async {
            Err::<String, _>(LlmError::RateLimited)
        })
        .await;
        assert!(matches!(result, Err(LlmError::RetriesExhausted(3))));
    }

    #[tokio::test]
    async fn missing_credentials_fail_fast() {
        let calls = AtomicU32::new(0);
        let result = with_retries(RetryPolicy::immediate(3), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<String, _>(LlmError::MissingCredentials("GROQ_API_KEY")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_requires_provider_key() {
        let settings = Settings::default();
        assert!(matches!(
            llm_from_settings(&settings),
            Err(LlmError::MissingCredentials("GROQ_API_KEY"))
        ));

        let settings = Settings {
            llm_provider: LlmProvider::Gemini,
            gemini_api_key: Some("key".to_string()),
            ..Settings::default()
        };
        let client = llm_from_settings(&settings).unwrap();
        assert_eq!(client.model(), "gemini-1.5-flash");
    }
}
