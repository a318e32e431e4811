//! Request and response bodies

use serde::{Deserialize, Serialize};

/// Default number of search hits
pub const DEFAULT_TOP_K: usize = 5;
/// Upper bound on search hits
pub const MAX_TOP_K: usize = 50;
/// Default number of audit rows
pub const DEFAULT_MISSION_LIMIT: usize = 20;
/// Upper bound on audit rows
pub const MAX_MISSION_LIMIT: usize = 100;

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// RFC 3339 UTC timestamp
    pub server_time: String,
    /// `up` or `error: ...`
    pub database: String,
    /// `up` or `error: ...`
    pub chromadb: String,
    /// `ok` when every dependency is up, else `degraded`
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub intent: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub chunks: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MissionsQuery {
    pub limit: Option<usize>,
}

impl MissionsQuery {
    /// Requested limit clamped to `1..=MAX_MISSION_LIMIT`
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_MISSION_LIMIT)
            .clamp(1, MAX_MISSION_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "h100"}"#).unwrap();
        assert_eq!(req.top_k, DEFAULT_TOP_K);
        assert_eq!(req.conversation_id, None);
    }

    #[test]
    fn mission_limit_is_clamped() {
        assert_eq!(MissionsQuery::default().limit(), DEFAULT_MISSION_LIMIT);
        assert_eq!(MissionsQuery { limit: Some(0) }.limit(), 1);
        assert_eq!(MissionsQuery { limit: Some(10_000) }.limit(), MAX_MISSION_LIMIT);
    }
}
