//! MIA Agent - the mission orchestrator
//!
//! Turns a natural-language research request into a plan, runs the research
//! tools, synthesizes a report with the LLM and hands it to the action tools.
//! Completed missions are recorded in a SQLite audit log.
//!
//! # Example
//!
//! ```rust,ignore
//! use mia_agent::AgentService;
//! use mia_core::MissionRequest;
//!
//! let agent = AgentService::from_settings(&settings, knowledge, Some(audit))?;
//! let outcome = agent.process_mission(&MissionRequest::new("H100 rental prices")).await?;
//! println!("{}", outcome.report);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod audit;
pub mod service;

pub use audit::{MissionLog, MissionStore, STATUS_COMPLETED};
pub use service::{
    looks_blocked, AgentService, AgentTools, MissionContext, MIN_USEFUL_PAGE_CHARS,
    SCRAPE_INGEST_CHARS,
};
