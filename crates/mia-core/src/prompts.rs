//! Prompt templates for planning, intent detection and report synthesis

/// System message sent with every chat completion
pub const ANALYST_SYSTEM_PROMPT: &str =
    "You are a professional market analyst. Output in Markdown.";

/// Fallback intent when the LLM is unavailable
pub const DEFAULT_INTENT: &str = "General Intelligence Gathering";

const MISSION_PLAN_TEMPLATE: &str = r#"
You are an AI Mission Commander. You must generate a multi-step execution plan in JSON.
Output ONLY a valid JSON list of objects. No preamble.

TOOLS AVAILABLE:
- web_research: Scrapes a URL. Required arg: {"url": "string"}
- web_search: General search. Required arg: {"query": "string"}
- save_to_notion: Archives findings. Required args: {"title": "string", "content": "string"}
- dispatch_email: Sends results. Required args: {"content": "string"}

CRITICAL RULES:
1. DATA PERSISTENCE: The 'content' arguments for save_to_notion and dispatch_email MUST NOT be empty. You must populate them with a placeholder instruction like "Synthesize all H100 pricing found into a report here."
2. STRATEGY: Always follow a specific site scrape with a general web_search as a Plan B.
3. CONTEXT: If the mission is about pricing, ensure the plan ends with archiving and emailing those specific numbers.

JSON FORMAT EXAMPLE:
[
  {
    "step": 1,
    "tool": "web_research",
    "args": {"url": "https://lambdalabs.com/service/gpu-cloud"},
    "thought": "Directly checking the GPU cloud subpage for H100 pricing."
  },
  {
    "step": 2,
    "tool": "save_to_notion",
    "args": {
        "title": "Lambda Labs H100 Pricing 2026",
        "content": "Detailed breakdown of hourly H100 rates and availability found during research."
    },
    "thought": "Saving the specific prices found in Step 1 to the database."
  }
]

Mission: {user_input}
"#;

const REPORT_SYNTHESIS_TEMPLATE: &str = r#"
You are a Senior Market Analyst. Use the DATA POOL to create a report.
If the DATA POOL contains specific prices (e.g., $2.49/hr), you MUST use those.
If no prices are found, clearly state "DATA NOT FOUND" rather than hallucinating.

DATA POOL:
{intel_pool}

REPORT FORMAT:
# 📊 Market Intelligence Report
## 💰 Confirmed Pricing
(Insert table here)
"#;

/// Planning prompt for a mission
#[must_use]
pub fn mission_plan_prompt(user_input: &str) -> String {
    MISSION_PLAN_TEMPLATE.replace("{user_input}", user_input)
}

/// Synthesis prompt over the gathered intel
#[must_use]
pub fn report_synthesis_prompt(intel_pool: &str) -> String {
    REPORT_SYNTHESIS_TEMPLATE.replace("{intel_pool}", intel_pool)
}

/// Short intent classification prompt
#[must_use]
pub fn intent_prompt(user_input: &str) -> String {
    format!(
        "Identify the core intent of this market intelligence query in 3 words: {user_input}"
    )
}
