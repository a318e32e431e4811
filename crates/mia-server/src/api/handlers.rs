//! HTTP handlers

use super::errors::ApiError;
use super::models::{
    AnalyzeResponse, DocumentRequest, DocumentResponse, HealthResponse, MissionsQuery,
    RootResponse, SearchRequest, MAX_TOP_K,
};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use mia_agent::{AgentService, MissionLog, MissionStore};
use mia_core::{MissionOutcome, MissionRequest};
use mia_knowledge::{KnowledgeBase, SearchHit};
use std::sync::Arc;

/// Shared application state
///
/// Startup failures of the audit log or the agent are kept as their error
/// text so the server still answers health checks.
#[derive(Debug, Clone)]
pub struct AppState {
    pub knowledge: KnowledgeBase,
    pub audit: Result<Arc<MissionStore>, String>,
    pub agent: Result<Arc<AgentService>, String>,
}

impl AppState {
    fn agent(&self, context: &str) -> Result<&AgentService, ApiError> {
        self.agent
            .as_deref()
            .map_err(|reason| ApiError::Internal(format!("{context}: Agent unavailable: {reason}")))
    }

    fn audit(&self) -> Result<Arc<MissionStore>, ApiError> {
        self.audit.clone().map_err(|reason| {
            ApiError::ServiceUnavailable(format!("Audit log unavailable: {reason}"))
        })
    }
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        status: "online".to_string(),
        version: mia_core::VERSION.to_string(),
    })
}

/// Dependency status; always 200
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let audit = state.audit.clone();
    let database = tokio::task::spawn_blocking(move || match audit {
        Ok(store) => store.ping().map_err(|e| e.to_string()),
        Err(reason) => Err(reason),
    });

    let knowledge = state.knowledge.clone();
    let vectors = tokio::task::spawn_blocking(move || {
        knowledge
            .store()
            .list_collections()
            .map(|_| ())
            .map_err(|e| e.to_string())
    });

    let (database, vectors) = futures::join!(database, vectors);
    let database = component_status(database.unwrap_or_else(|e| Err(e.to_string())));
    let chromadb = component_status(vectors.unwrap_or_else(|e| Err(e.to_string())));

    let status = if database == "up" && chromadb == "up" {
        "ok"
    } else {
        tracing::warn!(%database, %chromadb, "Health degraded");
        "degraded"
    };

    Json(HealthResponse {
        server_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        database,
        chromadb,
        status: status.to_string(),
    })
}

fn component_status(check: Result<(), String>) -> String {
    match check {
        Ok(()) => "up".to_string(),
        Err(e) => format!("error: {e}"),
    }
}

pub async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<MissionRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let agent = state.agent("Analysis Error")?;
    let intent = agent.identify_intent(&request.user_input).await;
    Ok(Json(AnalyzeResponse { intent }))
}

pub async fn execute(
    State(state): State<AppState>,
    Json(request): Json<MissionRequest>,
) -> Result<Json<MissionOutcome>, ApiError> {
    let agent = state.agent("Execution Error")?;
    let outcome = agent
        .process_mission(&request)
        .await
        .map_err(|e| ApiError::Internal(format!("Execution Error: {e}")))?;
    Ok(Json(outcome))
}

pub async fn ingest_document(
    State(state): State<AppState>,
    Json(request): Json<DocumentRequest>,
) -> Result<Json<DocumentResponse>, ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }

    let chunks = state
        .knowledge
        .ingest_document(
            &request.title,
            &request.content,
            request.conversation_id.unwrap_or(0),
        )
        .await
        .map_err(|e| ApiError::Internal(format!("Ingestion Error: {e}")))?;
    Ok(Json(DocumentResponse { chunks }))
}

pub async fn search_documents(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    if request.top_k == 0 || request.top_k > MAX_TOP_K {
        return Err(ApiError::BadRequest(format!(
            "top_k must be between 1 and {MAX_TOP_K}"
        )));
    }

    let hits = state
        .knowledge
        .search(&request.query, request.top_k, request.conversation_id)
        .await
        .map_err(|e| ApiError::Internal(format!("Search Error: {e}")))?;
    Ok(Json(hits))
}

pub async fn list_missions(
    State(state): State<AppState>,
    Query(query): Query<MissionsQuery>,
) -> Result<Json<Vec<MissionLog>>, ApiError> {
    let audit = state.audit()?;
    let limit = query.limit();
    let rows = tokio::task::spawn_blocking(move || audit.recent(limit))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Audit Error: {e}")))?;
    Ok(Json(rows))
}

pub async fn conversation_missions(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<Vec<MissionLog>>, ApiError> {
    let audit = state.audit()?;
    let rows = tokio::task::spawn_blocking(move || audit.for_conversation(conversation_id))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| ApiError::Internal(format!("Audit Error: {e}")))?;

    if rows.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No missions recorded for conversation {conversation_id}"
        )));
    }
    Ok(Json(rows))
}
