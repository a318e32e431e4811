//! REST API: router, handlers, models and errors.

/// API error type with `IntoResponse`.
pub mod errors;
/// Route handlers and shared state.
pub mod handlers;
/// Request and response bodies.
pub mod models;

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use handlers::AppState;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/execute", post(handlers::execute))
        .route("/documents", post(handlers::ingest_document))
        .route("/documents/search", post(handlers::search_documents))
        .route("/missions", get(handlers::list_missions))
        .route("/missions/:conversation_id", get(handlers::conversation_missions))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Credentialed CORS for the configured origins
///
/// Request headers are mirrored because `*` is not allowed together with
/// credentials. A `*` origin mirrors the caller's origin for the same reason.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        tracing::warn!("No CORS origins configured, cross-origin requests will be rejected");
    }

    let allow_origin = if origins.iter().any(|o| o == "*") {
        tracing::warn!("Wildcard CORS origin configured, mirroring request origins");
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(%origin, error = %e, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use mia_test_utils::AgentHarness;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(harness: &AgentHarness) -> Router {
        let state = AppState {
            knowledge: harness.knowledge.clone(),
            audit: Ok(Arc::clone(&harness.audit)),
            agent: Ok(Arc::new(harness.agent())),
        };
        create_router(state, &["http://localhost:3000".to_string()])
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let harness = AgentHarness::new(Vec::<String>::new());
        let resp = router(&harness)
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let harness = AgentHarness::new(Vec::<String>::new());
        let resp = router(&harness)
            .oneshot(Request::get("/execute").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn wildcard_and_invalid_origins_do_not_panic() {
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://ok.example".to_string(), "bad\norigin".to_string()]);
        let _ = cors_layer(&[]);
    }
}
