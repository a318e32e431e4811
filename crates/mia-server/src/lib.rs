//! mia-server: HTTP service for the Market Intelligence Agent.
//!
//! Exposes mission analysis and execution, document ingestion and search,
//! the mission audit log, and a dependency health check.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

/// REST API layer: Axum router, HTTP handlers, models, errors.
pub mod api;
/// Tracing subscriber setup.
pub mod telemetry;

pub use api::create_router;
pub use api::handlers::AppState;
