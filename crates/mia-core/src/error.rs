//! Error types for MIA
//!
//! One enum per external concern:
//! - Configuration
//! - LLM chat completion
//! - Embedding and vector storage
//! - Page scraping and web search
//! - Report delivery (Notion, email)
//! - Audit log
//!
//! `AgentError` is the top-level error surfaced by mission orchestration.

/// Settings could not be interpreted
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Only SQLite URLs are supported for the audit log
    #[error("unsupported database url: {0}")]
    UnsupportedDatabaseUrl(String),
}

/// Chat completion failures
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// Provider credentials are missing
    #[error("{0} is required for the selected LLM provider")]
    MissingCredentials(&'static str),

    /// Request exceeded the configured timeout
    #[error("LLM request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Provider answered with a non-success status
    #[error("LLM HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// 429 from provider
    #[error("LLM rate limit hit")]
    RateLimited,

    /// Provider answered without any content
    #[error("empty response from LLM")]
    EmptyResponse,

    /// Connection or decoding failure
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// Every attempt was rate limited
    #[error("maximum retries ({0}) reached")]
    RetriesExhausted(u32),
}

impl LlmError {
    /// Check if another attempt may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::MissingCredentials(_) | Self::RetriesExhausted(_))
    }
}

/// Embedding failures
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("{0} is required for the selected embedding provider")]
    MissingCredentials(&'static str),

    #[error("embedding HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("embedding transport error: {0}")]
    Transport(String),

    /// Payload did not have the expected list-of-vectors shape
    #[error("invalid embedding payload: {0}")]
    InvalidPayload(String),

    /// Provider returned a different number of vectors than texts
    #[error("expected {expected} vectors, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Vector store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Vector length differs from the collection's dimension
    #[error("dimension mismatch: collection has {expected}, vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}

/// Page scraping failures
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Request timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// Navigation failed (DNS, TLS, HTTP status ...)
    #[error("{0}")]
    Navigation(String),

    /// Browser process could not be started or crashed
    #[error("browser failure: {0}")]
    Browser(String),

    /// Target or a redirect hop points into a private network
    #[error("{0}")]
    Rejected(#[from] UrlRejection),

    /// HTTP client could not be built
    #[error("scraper setup failed: {0}")]
    Setup(String),
}

/// Web search failures
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search provider returned status {0}")]
    Status(u16),
}

/// Report delivery failures (Notion, email)
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Channel is not configured
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("delivery rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("delivery transport error: {0}")]
    Transport(String),
}

/// Audit log failures
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// URL rejected by validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlRejection {
    #[error("URL is empty")]
    Empty,

    #[error("URL exceeds {0} characters")]
    TooLong(usize),

    #[error("URL could not be parsed: {0}")]
    Malformed(String),

    #[error("scheme '{0}' is not allowed (use http or https)")]
    Scheme(String),

    #[error("URL has no host")]
    MissingHost,

    #[error("URL must not embed credentials")]
    Credentials,

    #[error("host '{0}' is not publicly routable")]
    PrivateHost(String),

    /// Public name whose DNS answer is a private address
    #[error("host '{host}' resolves to non-public address {addr}")]
    PrivateAddress { host: String, addr: std::net::IpAddr },
}

/// Mission orchestration errors
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Empty or otherwise unusable mission text
    #[error("invalid mission: {0}")]
    InvalidMission(String),

    #[error("llm failed: {0}")]
    Llm(#[from] LlmError),

    /// A production tool could not be constructed
    #[error("tool setup failed: {0}")]
    Tools(#[from] ScrapeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_timeout_message() {
        let err = ScrapeError::Timeout { secs: 30 };
        assert_eq!(err.to_string(), "Request timed out after 30 seconds");
    }

    #[test]
    fn llm_retryability() {
        assert!(LlmError::RateLimited.is_retryable());
        assert!(LlmError::Timeout { secs: 60 }.is_retryable());
        assert!(!LlmError::MissingCredentials("GROQ_API_KEY").is_retryable());
        assert!(!LlmError::RetriesExhausted(3).is_retryable());
    }

    #[test]
    fn rejected_scrape_shows_reason() {
        let err = ScrapeError::from(UrlRejection::PrivateAddress {
            host: "internal.example".to_string(),
            addr: std::net::IpAddr::from([10, 0, 0, 7]),
        });
        assert_eq!(
            err.to_string(),
            "host 'internal.example' resolves to non-public address 10.0.0.7"
        );
    }

    #[test]
    fn agent_error_display() {
        let err = AgentError::from(LlmError::EmptyResponse);
        assert!(err.to_string().contains("empty response"));
    }
}
