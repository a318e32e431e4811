//! MIA Core - Market Intelligence Agent foundations
//!
//! Shared building blocks for every other crate in the workspace:
//! - Process settings (CLI flags and environment)
//! - Error enums for each external concern
//! - Mission, plan and trace types
//! - Prompt templates
//! - URL validation and report integrity checks
//!
//! # Example
//!
//! ```rust,ignore
//! use mia_core::{extract_plan, ToolKind};
//!
//! let plan = extract_plan(r#"Sure: [{"step": 1, "tool": "web_search", "args": {"query": "H100"}}]"#);
//! assert_eq!(plan[0].kind(), Some(ToolKind::WebSearch));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod plan;
pub mod prompts;
pub mod types;
pub mod validation;

pub use config::{LlmProvider, LogFormat, Settings, SqliteTarget};
pub use error::{
    AgentError, AuditError, ConfigError, DeliveryError, EmbeddingError, LlmError, ScrapeError,
    SearchError, StoreError, UrlRejection,
};
pub use plan::extract_plan;
pub use types::{
    mission_id_for, MissionOutcome, MissionRequest, PlanStep, ToolKind, TraceEntry,
    DEFAULT_MISSION_ID,
};
pub use validation::{integrity_check, is_public_ip, validate_url, MISSION_FAILED_FALLBACK};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
