//! Plan extraction from raw LLM output

use crate::types::PlanStep;
use once_cell::sync::Lazy;
use regex::Regex;

// Greedy: from the first '[' to the last ']'.
static PLAN_ARRAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)(\[.*\])").unwrap_or_else(|e| panic!("plan regex literal is valid: {e}"))
});

/// Extract the JSON plan array from an LLM answer
///
/// Models often wrap the array in prose or code fences. Anything that is not
/// a parseable array of steps yields an empty plan.
#[must_use]
pub fn extract_plan(raw: &str) -> Vec<PlanStep> {
    let Some(found) = PLAN_ARRAY.captures(raw).and_then(|c| c.get(1)) else {
        tracing::error!("LLM failed to return a JSON plan array");
        return Vec::new();
    };

    match serde_json::from_str::<Vec<PlanStep>>(found.as_str()) {
        Ok(plan) => {
            tracing::info!(steps = plan.len(), "Plan generated");
            plan
        }
        Err(e) => {
            tracing::error!(error = %e, "Plan JSON could not be parsed");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolKind;
    use proptest::prelude::*;

    #[test]
    fn extracts_fenced_plan() {
        let raw = "Here is the plan:\n```json\n[\n {\"step\": 1, \"tool\": \"web_research\", \
                   \"args\": {\"url\": \"https://lambdalabs.com\"}, \"thought\": \"check\"},\n \
                   {\"step\": 2, \"tool\": \"dispatch_email\", \
                   \"args\": {\"content\": \"x\"}}\n]\n```";
        let plan = extract_plan(raw);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].kind(), Some(ToolKind::WebResearch));
        assert_eq!(plan[0].thought, "check");
        assert_eq!(plan[1].kind(), Some(ToolKind::DispatchEmail));
    }

    #[test]
    fn no_array_yields_empty_plan() {
        assert!(extract_plan("I cannot help with that.").is_empty());
    }

    #[test]
    fn invalid_json_yields_empty_plan() {
        assert!(extract_plan("[{\"tool\": web_search}]").is_empty());
    }

    #[test]
    fn trailing_brackets_in_prose_break_parsing() {
        // The greedy match spans to the last ']', so trailing prose with brackets invalidates it.
        let raw = "[{\"tool\": \"web_search\"}] see [1]";
        assert!(extract_plan(raw).is_empty());
    }

    proptest! {
        #[test]
        fn prop_never_panics(raw in ".*") {
            let _ = extract_plan(&raw);
        }
    }
}
