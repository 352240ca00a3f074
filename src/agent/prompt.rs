//! System preamble and the decision/outcome transcript used for
//! summarization.

use crate::config::DecisionFormat;
use crate::tools::ToolRegistry;
use crate::types::CallOutcome;
use tracing::debug;

/// Default system preamble.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's question by using the available tools.";

/// Prefix of the transcript line carrying the serialized outcomes.
pub const OUTCOMES_PREFIX: &str = "Outcomes: ";

const DECISION_PREFIX: &str = "Decision: ";

const SUMMARY_INSTRUCTION: &str =
    "Summarize the outcome above and give the final answer to the user.";

const MARKER_INSTRUCTIONS: &str = r#"
# Response format

Reply with exactly one action, using this layout:

Thought: <your reasoning>
Action: {"tool": "<tool name>", "parameters": {<arguments>}}
Observation:
"#;

/// Build the single system message for a session.
pub fn build_system_prompt(base: &str, format: DecisionFormat, registry: &ToolRegistry) -> String {
    let mut prompt = String::with_capacity(base.len() + 512);
    prompt.push_str(base.trim());

    if format == DecisionFormat::Marker {
        prompt.push('\n');
        prompt.push_str(MARKER_INSTRUCTIONS);
        if !registry.is_empty() {
            prompt.push_str("\n# Available Tools\n\n");
            for d in registry.descriptors() {
                prompt.push_str(&format!("- `{}`: {}\n", d.name, d.description));
                prompt.push_str(&format!("  parameters: {}\n", d.parameters_schema()));
            }
        }
    }

    debug!("System prompt: {} chars", prompt.len());
    prompt
}

/// Assistant turn narrating the decision and its outcomes.
pub fn summary_transcript(rationale: &str, outcomes: &[CallOutcome]) -> String {
    let serialized = serde_json::to_string(outcomes).unwrap_or_else(|_| "[]".into());
    format!(
        "{}{}\n{}{}\n{}",
        DECISION_PREFIX, rationale, OUTCOMES_PREFIX, serialized, SUMMARY_INSTRUCTION
    )
}

/// Recover the outcomes from a transcript built by [`summary_transcript`].
///
/// The rationale is model text and may itself contain an outcomes line, so
/// the search starts from the end.
pub fn outcomes_from_transcript(transcript: &str) -> Option<Vec<CallOutcome>> {
    transcript
        .lines()
        .rev()
        .find_map(|line| line.strip_prefix(OUTCOMES_PREFIX))
        .and_then(|json| serde_json::from_str(json).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin_registry;
    use crate::types::CallRequest;
    use serde_json::{json, Map};

    #[test]
    fn structured_prompt_is_just_the_preamble() {
        let registry = builtin_registry().unwrap();
        let prompt = build_system_prompt(DEFAULT_SYSTEM_PROMPT, DecisionFormat::Structured, &registry);
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn marker_prompt_lists_tools_and_layout() {
        let registry = builtin_registry().unwrap();
        let prompt = build_system_prompt(DEFAULT_SYSTEM_PROMPT, DecisionFormat::Marker, &registry);
        assert!(prompt.contains("Thought:"));
        assert!(prompt.contains("- `add`"));
        assert!(prompt.contains("- `get_weather`"));
    }

    #[test]
    fn transcript_carries_outcomes() {
        let request = CallRequest::new("add", Map::new());
        let outcomes = vec![CallOutcome::success(&request, json!(8), 2)];
        let transcript = summary_transcript("stop", &outcomes);

        assert!(transcript.starts_with("Decision: stop\n"));
        assert!(transcript.ends_with(SUMMARY_INSTRUCTION));
        assert_eq!(outcomes_from_transcript(&transcript), Some(outcomes));
    }

    #[test]
    fn outcomes_line_in_rationale_is_ignored() {
        let request = CallRequest::new("add", Map::new());
        let outcomes = vec![CallOutcome::success(&request, json!(8), 1)];
        let transcript = summary_transcript("I will add.\nOutcomes: []", &outcomes);

        assert_eq!(outcomes_from_transcript(&transcript), Some(outcomes));
    }

    #[test]
    fn transcript_without_outcomes_line_is_none() {
        assert!(outcomes_from_transcript("just text").is_none());
    }
}
