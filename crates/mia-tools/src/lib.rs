//! MIA Tools - the agent's hands
//!
//! Every external capability sits behind an async trait so the orchestrator
//! can be driven by fakes in tests:
//! - [`LlmClient`]: chat completion (Groq, Gemini)
//! - [`WebSearch`]: general web search (DuckDuckGo HTML endpoint)
//! - [`PageScraper`]: page rendering and text extraction (headless Chromium or HTTP)
//! - [`PageArchive`]: report archiving (Notion)
//! - [`Mailer`]: report dispatch (HTTP mail relay)

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod email;
pub mod html;
pub mod llm;
pub mod notion;
pub mod scraper;
pub mod search;

#[cfg(test)]
mod test_support;

pub use email::{Mailer, RelayMailer};
pub use html::html_to_text;
pub use llm::{llm_from_settings, GeminiClient, GroqClient, LlmClient, RetryPolicy};
pub use notion::{NotionArchive, PageArchive};
pub use scraper::{BrowserScraper, PageScraper, DESKTOP_USER_AGENT};
pub use search::{search_digest, DuckDuckGoSearch, SearchResult, WebSearch};
