//! Testing utilities for the MIA workspace
//!
//! Scripted fakes for every tool seam plus a harness that wires them into an
//! [`AgentService`] backed by a temporary vector store.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use mia_agent::{AgentService, AgentTools, MissionStore};
use mia_core::{DeliveryError, LlmError, ScrapeError, SearchError};
use mia_knowledge::{KnowledgeBase, LocalEmbedder, VectorStore};
use mia_tools::{LlmClient, Mailer, PageArchive, PageScraper, SearchResult, WebSearch};
use parking_lot::Mutex;
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tempfile::TempDir;

/// Dimension of the offline embedder used in tests
pub const TEST_EMBED_DIM: usize = 64;

/// LLM answering from a queue; an empty queue yields `EmptyResponse`
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn push_err(&self, error: LlmError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Search returning fixed results, or failing with a status code
#[derive(Debug, Default)]
pub struct FakeSearch {
    results: Vec<SearchResult>,
    failure: Option<u16>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn with_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            failure: Some(status),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl WebSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.queries.lock().push(query.to_string());
        match self.failure {
            Some(status) => Err(SearchError::Status(status)),
            None => Ok(self.results.clone()),
        }
    }
}

/// Outcome served for one URL
#[derive(Debug, Clone)]
pub enum FakePage {
    Text(String),
    Timeout(u64),
    Failure(String),
}

/// Scraper serving canned pages keyed by URL
#[derive(Debug, Default)]
pub struct FakeScraper {
    pages: HashMap<String, FakePage>,
    visited: Mutex<Vec<String>>,
}

impl FakeScraper {
    #[must_use]
    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        let key = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string());
        self.pages.insert(key, page);
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().clone()
    }
}

#[async_trait]
impl PageScraper for FakeScraper {
    async fn scrape(&self, url: &Url) -> Result<String, ScrapeError> {
        self.visited.lock().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(FakePage::Text(text)) => Ok(text.clone()),
            Some(FakePage::Timeout(secs)) => Err(ScrapeError::Timeout { secs: *secs }),
            Some(FakePage::Failure(msg)) => Err(ScrapeError::Navigation(msg.clone())),
            None => Err(ScrapeError::Navigation(format!("net::ERR_NAME_NOT_RESOLVED at {url}"))),
        }
    }
}

/// Archive that records pages, optionally rejecting them
#[derive(Debug, Default)]
pub struct RecordingArchive {
    reject: bool,
    pages: Mutex<Vec<(String, String)>>,
}

impl RecordingArchive {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    /// `(title, content)` of archived pages
    pub fn pages(&self) -> Vec<(String, String)> {
        self.pages.lock().clone()
    }
}

#[async_trait]
impl PageArchive for RecordingArchive {
    async fn archive(&self, title: &str, content: &str) -> Result<(), DeliveryError> {
        if self.reject {
            return Err(DeliveryError::Rejected {
                status: 400,
                message: "validation_error".to_string(),
            });
        }
        self.pages.lock().push((title.to_string(), content.to_string()));
        Ok(())
    }
}

/// Mailer that records messages; blank recipients are rejected
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMailer {
    /// `(to, subject, body)` of sent messages
    pub fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), DeliveryError> {
        if to.trim().is_empty() {
            return Err(DeliveryError::NotConfigured("EMAIL_USER"));
        }
        self.sent
            .lock()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

/// Knowledge base over a fresh store in `dir`, embedding offline
pub fn test_knowledge(dir: &std::path::Path) -> KnowledgeBase {
    let store = Arc::new(VectorStore::open(dir).unwrap());
    KnowledgeBase::new(store, Arc::new(LocalEmbedder::new(TEST_EMBED_DIM)))
}

/// Fakes plus temporary storage, ready to build an agent
#[derive(Debug)]
pub struct AgentHarness {
    pub dir: TempDir,
    pub llm: Arc<ScriptedLlm>,
    pub search: Arc<FakeSearch>,
    pub scraper: Arc<FakeScraper>,
    pub archive: Arc<RecordingArchive>,
    pub mailer: Arc<RecordingMailer>,
    pub audit: Arc<MissionStore>,
    pub knowledge: KnowledgeBase,
}

impl AgentHarness {
    /// Harness with the given LLM answers, no search results and no pages
    pub fn new<I, S>(llm_responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dir = TempDir::new().unwrap();
        let knowledge = test_knowledge(dir.path());
        Self {
            dir,
            llm: Arc::new(ScriptedLlm::new(llm_responses)),
            search: Arc::new(FakeSearch::default()),
            scraper: Arc::new(FakeScraper::default()),
            archive: Arc::new(RecordingArchive::default()),
            mailer: Arc::new(RecordingMailer::default()),
            audit: Arc::new(MissionStore::in_memory().unwrap()),
            knowledge,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: FakeSearch) -> Self {
        self.search = Arc::new(search);
        self
    }

    #[must_use]
    pub fn with_scraper(mut self, scraper: FakeScraper) -> Self {
        self.scraper = Arc::new(scraper);
        self
    }

    #[must_use]
    pub fn with_archive(mut self, archive: RecordingArchive) -> Self {
        self.archive = Arc::new(archive);
        self
    }

    pub fn tools(&self) -> AgentTools {
        AgentTools {
            search: self.search.clone(),
            scraper: self.scraper.clone(),
            archive: self.archive.clone(),
            mailer: self.mailer.clone(),
        }
    }

    /// Agent wired to the fakes, audit log and `ops@example.com` recipient
    pub fn agent(&self) -> AgentService {
        AgentService::new(self.llm.clone(), self.tools(), self.knowledge.clone())
            .with_audit(Arc::clone(&self.audit))
            .with_email_recipient("ops@example.com")
    }
}

/// Page text long enough to pass block detection
pub fn long_page(topic: &str) -> String {
    format!("{topic} pricing overview. ").repeat(40)
}

/// Canned LLM plan covering research and action tools
pub const FULL_PLAN: &str = r#"Here is the plan:
```json
[
  {"step": 1, "tool": "web_research", "args": {"url": "https://lambdalabs.com/service/gpu-cloud"}, "thought": "Direct scrape"},
  {"step": 2, "tool": "web_search", "args": {"query": "H100 hourly price"}, "thought": "Plan B"},
  {"step": 3, "tool": "save_to_notion", "args": {"title": "H100 Pricing", "content": "placeholder"}, "thought": "Archive"},
  {"step": 4, "tool": "dispatch_email", "args": {"content": "insert here"}, "thought": "Notify"}
]
```"#;
