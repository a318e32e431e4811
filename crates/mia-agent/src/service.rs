//! Mission orchestration
//!
//! A mission runs in four phases:
//! 1. Plan: the LLM turns the request into a JSON list of tool steps
//! 2. Gather: research steps run in plan order, their output forms the intel pool
//! 3. Synthesize: the LLM writes the report, which is persisted to vector memory and the audit log
//! 4. Act: action steps receive the report as `content`
//!
//! Intel is owned by a per-mission [`MissionContext`], so one service can run
//! concurrent missions.

use crate::audit::{MissionStore, STATUS_COMPLETED};
use chrono::Local;
use mia_core::prompts::{
    intent_prompt, mission_plan_prompt, report_synthesis_prompt, DEFAULT_INTENT,
};
use mia_core::{
    extract_plan, integrity_check, mission_id_for, validate_url, AgentError, MissionOutcome,
    MissionRequest, PlanStep, Settings, ToolKind, TraceEntry,
};
use mia_knowledge::KnowledgeBase;
use mia_tools::{
    llm_from_settings, search_digest, BrowserScraper, DuckDuckGoSearch, LlmClient, Mailer,
    NotionArchive, PageArchive, PageScraper, RelayMailer, WebSearch,
};
use std::sync::Arc;

/// Characters of a scraped page kept in vector memory
pub const SCRAPE_INGEST_CHARS: usize = 5000;

/// Pages shorter than this are treated as blocked
pub const MIN_USEFUL_PAGE_CHARS: usize = 500;

const BLOCK_MARKERS: [&str; 4] = ["cookie", "blocked", "verify", "robot"];

const DEFAULT_SEARCH_QUERY: &str = "Market Intelligence Query";

/// External capabilities used by missions
#[derive(Debug, Clone)]
pub struct AgentTools {
    pub search: Arc<dyn WebSearch>,
    pub scraper: Arc<dyn PageScraper>,
    pub archive: Arc<dyn PageArchive>,
    pub mailer: Arc<dyn Mailer>,
}

impl AgentTools {
    /// Production tools configured from settings
    pub fn from_settings(settings: &Settings) -> Result<Self, AgentError> {
        Ok(Self {
            search: Arc::new(DuckDuckGoSearch::new()),
            scraper: Arc::new(BrowserScraper::from_settings(settings)?),
            archive: Arc::new(NotionArchive::from_settings(settings)),
            mailer: Arc::new(RelayMailer::from_settings(settings)),
        })
    }
}

/// State owned by one running mission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionContext {
    pub mission_id: i64,
    /// Raw research output, replaced by the report after synthesis
    pub intel: String,
}

impl MissionContext {
    #[must_use]
    pub fn new(mission_id: i64) -> Self {
        Self {
            mission_id,
            intel: String::new(),
        }
    }
}

/// Market intelligence agent, shared across requests
#[derive(Debug, Clone)]
pub struct AgentService {
    llm: Arc<dyn LlmClient>,
    tools: AgentTools,
    knowledge: KnowledgeBase,
    audit: Option<Arc<MissionStore>>,
    email_recipient: Option<String>,
}

impl AgentService {
    /// Create agent
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, tools: AgentTools, knowledge: KnowledgeBase) -> Self {
        tracing::info!(model = llm.model(), "Agent service initialized");
        Self {
            llm,
            tools,
            knowledge,
            audit: None,
            email_recipient: None,
        }
    }

    /// Build from settings; fails when the LLM client or a tool cannot be created
    pub fn from_settings(
        settings: &Settings,
        knowledge: KnowledgeBase,
        audit: Option<Arc<MissionStore>>,
    ) -> Result<Self, AgentError> {
        let (llm, tools) = llm_from_settings(settings)
            .map_err(AgentError::from)
            .and_then(|llm| AgentTools::from_settings(settings).map(|tools| (llm, tools)))
            .inspect_err(|e| tracing::error!(error = %e, "Failed to initialize agent service"))?;

        let mut service = Self::new(llm, tools, knowledge);
        service.audit = audit;
        service.email_recipient = settings.email_recipient().map(str::to_string);
        Ok(service)
    }

    /// With audit log
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<MissionStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// With report recipient for `dispatch_email`
    #[must_use]
    pub fn with_email_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.email_recipient = Some(recipient.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    #[inline]
    #[must_use]
    pub fn audit(&self) -> Option<&Arc<MissionStore>> {
        self.audit.as_ref()
    }

    /// Short intent label; never fails
    pub async fn identify_intent(&self, user_input: &str) -> String {
        tracing::info!(input = %preview(user_input, 30), "Identifying intent");
        match self.llm.generate(&intent_prompt(user_input)).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(error = %e, "Intent identification failed");
                DEFAULT_INTENT.to_string()
            }
        }
    }

    /// Ask the LLM for a plan; unparseable answers give an empty plan
    pub async fn generate_plan(&self, user_input: &str) -> Result<Vec<PlanStep>, AgentError> {
        tracing::info!(input = %preview(user_input, 50), "Generating execution plan");
        let raw = self.llm.generate(&mission_plan_prompt(user_input)).await?;
        Ok(extract_plan(&raw))
    }

    /// Run one plan step and describe the outcome as text
    ///
    /// Tool failures never abort a mission; they are reported in the
    /// returned text and flow into the intel pool or trace.
    pub async fn execute_tool(&self, step: &PlanStep, ctx: &MissionContext) -> String {
        tracing::info!(tool = %step.tool, mission_id = ctx.mission_id, "Executing tool");

        let Some(kind) = step.kind() else {
            return format!("Error: Tool '{}' not found.", step.tool);
        };

        match kind {
            ToolKind::WebResearch => self.web_research(step, ctx).await,
            ToolKind::WebSearch => {
                let query = step
                    .arg_text(&["query"])
                    .unwrap_or_else(|| DEFAULT_SEARCH_QUERY.to_string());
                search_digest(self.tools.search.as_ref(), &query).await
            }
            ToolKind::SaveToNotion => {
                let title = step
                    .arg_text(&["title"])
                    .unwrap_or_else(|| format!("Report {}", Local::now().date_naive()));
                let content = step.arg_text(&["content"]).unwrap_or_default();
                let content = integrity_check(&content, &ctx.intel);
                match self.tools.archive.archive(&title, &content).await {
                    Ok(()) => "✅ Notion OK".to_string(),
                    Err(e) => {
                        tracing::error!(error = %e, "Notion archive failed");
                        "❌ Notion Error".to_string()
                    }
                }
            }
            ToolKind::DispatchEmail => {
                let content = step.arg_text(&["content"]).unwrap_or_default();
                let content = integrity_check(&content, &ctx.intel);
                let subject = format!(
                    "Agent Report: {}",
                    step.arg_text(&["title"]).unwrap_or_else(|| "Update".to_string())
                );
                let to = self.email_recipient.as_deref().unwrap_or_default();
                match self.tools.mailer.send(to, &subject, &content).await {
                    Ok(()) => "✅ Email OK".to_string(),
                    Err(e) => {
                        tracing::error!(error = %e, "Email dispatch failed");
                        "❌ Email Error".to_string()
                    }
                }
            }
        }
    }

    async fn web_research(&self, step: &PlanStep, ctx: &MissionContext) -> String {
        let Some(raw_url) = step.arg_text(&["url", "link"]) else {
            return "Error: No URL provided for web_research".to_string();
        };
        let url_str = raw_url.trim();

        let url = match validate_url(url_str) {
            Ok(url) => url,
            Err(reason) => {
                tracing::warn!(url = url_str, %reason, "Invalid URL rejected");
                return format!("Error: Invalid URL - {reason}");
            }
        };

        let result = match self.tools.scraper.scrape(&url).await {
            Ok(text) => {
                let excerpt: String = text.chars().take(SCRAPE_INGEST_CHARS).collect();
                let title = format!("Scrape: {url_str}");
                if let Err(e) = self
                    .knowledge
                    .ingest_document(&title, &excerpt, ctx.mission_id)
                    .await
                {
                    tracing::error!(error = %e, "Failed to ingest scraped page");
                }
                text
            }
            Err(e) => format!("Error: {e}"),
        };

        if looks_blocked(&result) {
            tracing::warn!(url = url_str, "Protection detected, falling back to search");
            return search_digest(
                self.tools.search.as_ref(),
                &format!("Latest info from {url_str}"),
            )
            .await;
        }
        result
    }

    /// Plan, gather, synthesize, persist and act
    pub async fn process_mission(
        &self,
        request: &MissionRequest,
    ) -> Result<MissionOutcome, AgentError> {
        if request.user_input.trim().is_empty() {
            return Err(AgentError::InvalidMission("mission text is empty".to_string()));
        }

        let mission_id = mission_id_for(request.conversation_id);
        tracing::info!(mission_id, "Mission started");

        let plan = self.generate_plan(&request.user_input).await?;
        let mut ctx = MissionContext::new(mission_id);
        let mut trace = Vec::new();

        for step in plan.iter().filter(|s| s.kind().is_some_and(|k| k.is_research())) {
            let result = self.execute_tool(step, &ctx).await;
            ctx.intel.push_str(&format!("\n---\n{result}\n"));
            trace.push(TraceEntry::gathered(&step.tool));
        }

        let report = self.llm.generate(&report_synthesis_prompt(&ctx.intel)).await?;
        ctx.intel.clone_from(&report);
        self.persist(&report, mission_id, &request.user_input).await;

        for step in plan.iter().filter(|s| s.kind().is_some_and(|k| k.is_action())) {
            let mut step = step.clone();
            step.args.insert("content".to_string(), report.clone().into());
            let result = self.execute_tool(&step, &ctx).await;
            trace.push(TraceEntry::action(&step.tool, result));
        }

        tracing::info!(mission_id, steps = trace.len(), "Mission complete");
        Ok(MissionOutcome::complete(mission_id, report, trace))
    }

    /// Store the report in vector memory and the audit log; failures are logged only
    async fn persist(&self, report: &str, mission_id: i64, query: &str) {
        tracing::info!(mission_id, "Persisting report");

        let title = format!("Report_{mission_id}_{}", Local::now().format("%Y%m%d"));
        if let Err(e) = self.knowledge.ingest_document(&title, report, mission_id).await {
            tracing::error!(error = %e, "Report ingestion failed");
        }

        let Some(audit) = self.audit.clone() else {
            return;
        };
        let (query, report) = (query.to_string(), report.to_string());
        let recorded = tokio::task::spawn_blocking(move || {
            audit.record(mission_id, &query, &report, STATUS_COMPLETED)
        })
        .await;

        match recorded {
            Ok(Ok(id)) => tracing::info!(mission_id, audit_id = id, "Persistence successful"),
            Ok(Err(e)) => tracing::error!(error = %e, "Audit log write failed"),
            Err(e) => tracing::error!(error = %e, "Audit log task failed"),
        }
    }
}

/// Blocked, consent-walled or near-empty page
#[must_use]
pub fn looks_blocked(result: &str) -> bool {
    let lower = result.to_lowercase();
    result.chars().count() < MIN_USEFUL_PAGE_CHARS
        || BLOCK_MARKERS.iter().any(|m| lower.contains(m))
}

fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
