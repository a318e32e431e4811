//! Mission types
//!
//! Defines the data exchanged with clients and with the planning LLM:
//! - Mission requests and outcomes
//! - Plan steps and the tool catalogue
//! - Execution trace entries

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Mission id used when the client did not supply a conversation id
pub const DEFAULT_MISSION_ID: i64 = 999;

/// Incoming mission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionRequest {
    /// Natural language mission text
    pub user_input: String,
    /// Conversation this mission belongs to
    #[serde(default)]
    pub conversation_id: Option<i64>,
}

impl MissionRequest {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            conversation_id: None,
        }
    }

    /// With conversation id
    #[inline]
    #[must_use]
    pub fn with_conversation(mut self, id: i64) -> Self {
        self.conversation_id = Some(id);
        self
    }
}

/// Resolve the mission id; absent or zero ids fall back to [`DEFAULT_MISSION_ID`]
#[inline]
#[must_use]
pub fn mission_id_for(conversation_id: Option<i64>) -> i64 {
    match conversation_id {
        Some(id) if id != 0 => id,
        _ => DEFAULT_MISSION_ID,
    }
}

/// Tools the planner may schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Render and read a specific page
    WebResearch,
    /// General web search
    WebSearch,
    /// Archive the report in Notion
    SaveToNotion,
    /// Email the report
    DispatchEmail,
}

impl ToolKind {
    /// All tools, in catalogue order
    pub const ALL: [ToolKind; 4] = [
        ToolKind::WebResearch,
        ToolKind::WebSearch,
        ToolKind::SaveToNotion,
        ToolKind::DispatchEmail,
    ];

    /// Wire name used in plans
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::WebResearch => "web_research",
            ToolKind::WebSearch => "web_search",
            ToolKind::SaveToNotion => "save_to_notion",
            ToolKind::DispatchEmail => "dispatch_email",
        }
    }

    /// Gathers intel before synthesis
    #[inline]
    #[must_use]
    pub fn is_research(&self) -> bool {
        matches!(self, ToolKind::WebResearch | ToolKind::WebSearch)
    }

    /// Delivers the synthesised report
    #[inline]
    #[must_use]
    pub fn is_action(&self) -> bool {
        matches!(self, ToolKind::SaveToNotion | ToolKind::DispatchEmail)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// One step of an LLM-generated plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub step: u32,
    /// Tool name as written by the planner
    #[serde(default)]
    pub tool: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub thought: String,
}

impl PlanStep {
    /// Create new step
    #[must_use]
    pub fn new(step: u32, tool: ToolKind) -> Self {
        Self {
            step,
            tool: tool.as_str().to_string(),
            args: Map::new(),
            thought: String::new(),
        }
    }

    /// With argument
    #[must_use]
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Parsed tool, `None` when the planner invented one
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<ToolKind> {
        self.tool.parse().ok()
    }

    /// First non-empty argument among `keys`, rendered as text
    #[must_use]
    pub fn arg_text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|k| self.args.get(*k))
            .find_map(|v| match v {
                Value::Null => None,
                Value::String(s) if s.trim().is_empty() => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
    }
}

/// Execution trace entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl TraceEntry {
    /// Research step that contributed to the intel pool
    #[must_use]
    pub fn gathered(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: Some("Gathered".to_string()),
            result: None,
        }
    }

    /// Action step with its outcome
    #[must_use]
    pub fn action(tool: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            status: None,
            result: Some(result.into()),
        }
    }
}

/// Result of a full mission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionOutcome {
    pub status: String,
    pub mission_id: i64,
    pub report: String,
    pub trace: Vec<TraceEntry>,
}

impl MissionOutcome {
    /// Completed mission
    #[must_use]
    pub fn complete(mission_id: i64, report: String, trace: Vec<TraceEntry>) -> Self {
        Self {
            status: "complete".to_string(),
            mission_id,
            report,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn mission_id_defaults() {
        assert_eq!(mission_id_for(None), DEFAULT_MISSION_ID);
        assert_eq!(mission_id_for(Some(0)), DEFAULT_MISSION_ID);
        assert_eq!(mission_id_for(Some(42)), 42);
    }

    #[test]
    fn tool_kind_names() {
        for tool in ToolKind::ALL {
            assert_eq!(tool.as_str().parse::<ToolKind>(), Ok(tool));
        }
        assert!("launch_rocket".parse::<ToolKind>().is_err());
        assert!(ToolKind::WebSearch.is_research());
        assert!(ToolKind::DispatchEmail.is_action());
        assert!(!ToolKind::SaveToNotion.is_research());
    }

    #[test]
    fn plan_step_tolerates_missing_fields() {
        let step: PlanStep = serde_json::from_value(json!({"tool": "web_search"})).unwrap();
        assert_eq!(step.kind(), Some(ToolKind::WebSearch));
        assert!(step.args.is_empty());
        assert_eq!(step.step, 0);
    }

    #[test]
    fn arg_text_skips_blank_values() {
        let step = PlanStep::new(1, ToolKind::WebResearch)
            .with_arg("url", "  ")
            .with_arg("link", "https://example.com");
        assert_eq!(
            step.arg_text(&["url", "link"]).as_deref(),
            Some("https://example.com")
        );

        let step = PlanStep::new(2, ToolKind::WebSearch).with_arg("query", 42);
        assert_eq!(step.arg_text(&["query"]).as_deref(), Some("42"));
    }

    #[test]
    fn trace_entry_serialization_omits_absent_fields() {
        let gathered = serde_json::to_value(TraceEntry::gathered("web_search")).unwrap();
        assert_eq!(gathered, json!({"tool": "web_search", "status": "Gathered"}));

        let action =
            serde_json::to_value(TraceEntry::action("dispatch_email", "✅ Email OK")).unwrap();
        assert_eq!(action, json!({"tool": "dispatch_email", "result": "✅ Email OK"}));
    }

    #[test]
    fn mission_request_conversation_is_optional() {
        let req: MissionRequest =
            serde_json::from_value(json!({"user_input": "H100 prices"})).unwrap();
        assert_eq!(req, MissionRequest::new("H100 prices"));
    }
}
