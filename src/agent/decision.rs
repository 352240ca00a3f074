//! Decision extraction: turn a model response into a rationale plus the
//! calls it asks for.
//!
//! Two response shapes are understood:
//!
//! - marker text: `Thought: ...` / `Action: {json}` / `Observation:`
//! - structured tool calls with JSON-encoded argument strings
//!
//! Extraction never fails loudly. Anything that does not yield a call comes
//! back as `None` and is logged as a warning.

use crate::types::{new_call_id, CallArguments, CallRequest, ModelResponse, RawToolCall};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Rationale used when the response does not carry one.
pub const NO_THOUGHT: &str = "No thought.";

const THOUGHT_MARKER: &str = "Thought:";
const ACTION_MARKER: &str = "Action:";
const OBSERVATION_MARKER: &str = "Observation:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Marker,
    Structured,
}

/// The model's chosen action(s) for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub rationale: String,
    pub calls: Vec<CallRequest>,
    pub source: DecisionSource,
}

/// Result of parsing marker-format text.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerParse {
    Parsed { thought: String, action: Value },
    NoDecision { reason: String },
}

impl MarkerParse {
    fn none(reason: impl Into<String>) -> Self {
        Self::NoDecision {
            reason: reason.into(),
        }
    }
}

/// Extract a decision from any supported response shape.
///
/// Structured tool calls take precedence over text content.
pub fn extract_decision(response: &ModelResponse) -> Option<Decision> {
    if !response.tool_calls.is_empty() {
        return from_tool_calls(&response.tool_calls, response.finish_reason.as_deref());
    }

    match response.content.as_deref() {
        Some(text) if !text.trim().is_empty() => from_marker_text(text),
        _ => {
            warn!("Model response carried neither tool calls nor text");
            None
        }
    }
}

/// Marker-format variant: exactly one call, or no decision.
pub fn from_marker_text(text: &str) -> Option<Decision> {
    let (thought, action) = match parse_marker(text) {
        MarkerParse::Parsed { thought, action } => (thought, action),
        MarkerParse::NoDecision { reason } => {
            warn!(%reason, "No valid Action found in model output");
            return None;
        }
    };

    let Value::Object(mut action) = action else {
        warn!("Action is not a JSON object");
        return None;
    };

    // An empty name never resolves, so the call surfaces as a missing tool.
    let tool_name = match action.remove("tool") {
        Some(Value::String(name)) => name.trim().to_string(),
        _ => String::new(),
    };
    if tool_name.is_empty() {
        warn!("Action does not name a tool");
    }

    let arguments = match action.remove("parameters") {
        None | Some(Value::Null) => CallArguments::decoded(Map::new()),
        Some(Value::Object(values)) => CallArguments::decoded(values),
        Some(value) => CallArguments::NotAnObject { value },
    };

    debug!(tool = %tool_name, "Parsed marker-format action");
    Some(Decision {
        rationale: thought,
        calls: vec![CallRequest {
            call_id: new_call_id(),
            tool_name,
            arguments,
        }],
        source: DecisionSource::Marker,
    })
}

/// Parse `Thought: <text> Action: <json object> Observation:`.
///
/// The thought is optional; the action and its terminator are not.
/// `Action:` occurrences not followed by a JSON object are skipped.
pub fn parse_marker(text: &str) -> MarkerParse {
    if !text.contains(ACTION_MARKER) {
        return MarkerParse::none("missing Action marker");
    }

    let Some((action_at, body)) = find_action_block(text) else {
        return MarkerParse::none("no Action JSON object followed by Observation");
    };

    let thought = parse_thought(text, action_at);
    match serde_json::from_str::<Value>(body) {
        Ok(action) => MarkerParse::Parsed { thought, action },
        Err(e) => MarkerParse::none(format!("Action JSON does not parse: {}", e)),
    }
}

/// First `Action:` whose remainder opens a JSON object and is later
/// terminated by `Observation:`. Returns the marker offset and the body.
fn find_action_block(text: &str) -> Option<(usize, &str)> {
    text.match_indices(ACTION_MARKER).find_map(|(at, _)| {
        let rest = &text[at + ACTION_MARKER.len()..];
        if !rest.trim_start().starts_with('{') {
            return None;
        }
        let end = rest.find(OBSERVATION_MARKER)?;
        let body = rest[..end].trim();
        body.ends_with('}').then_some((at, body))
    })
}

/// Text after `Thought:` up to the `Action:` that starts a line, falling
/// back to the chosen action block.
fn parse_thought(text: &str, action_at: usize) -> String {
    let Some(start) = text[..action_at].find(THOUGHT_MARKER) else {
        return NO_THOUGHT.to_string();
    };
    let start = start + THOUGHT_MARKER.len();
    let end = text[start..]
        .find(&format!("\n{}", ACTION_MARKER))
        .map(|i| start + i)
        .filter(|&end| end <= action_at)
        .unwrap_or(action_at);

    let thought = text[start..end].trim();
    if thought.is_empty() {
        NO_THOUGHT.to_string()
    } else {
        thought.to_string()
    }
}

/// Structured variant: one call per entry, order preserved.
pub fn from_tool_calls(calls: &[RawToolCall], finish_reason: Option<&str>) -> Option<Decision> {
    if calls.is_empty() {
        warn!("Response contained an empty tool-call list");
        return None;
    }

    let calls: Vec<CallRequest> = calls.iter().map(call_request_from_raw).collect();
    let rationale = finish_reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(NO_THOUGHT)
        .to_string();

    debug!(calls = calls.len(), %rationale, "Parsed structured tool calls");
    Some(Decision {
        rationale,
        calls,
        source: DecisionSource::Structured,
    })
}

fn call_request_from_raw(raw: &RawToolCall) -> CallRequest {
    let call_id = raw
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(new_call_id);

    CallRequest {
        call_id,
        tool_name: raw.name.clone(),
        arguments: decode_arguments(&raw.arguments),
    }
}

/// Decode a JSON-encoded argument string. Blank means no arguments.
fn decode_arguments(raw: &str) -> CallArguments {
    if raw.trim().is_empty() {
        return CallArguments::decoded(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(values)) => CallArguments::decoded(values),
        Ok(Value::Null) => CallArguments::decoded(Map::new()),
        Ok(other) => CallArguments::Malformed {
            raw: raw.to_string(),
            reason: format!("arguments must be a JSON object, got {}", json_kind(&other)),
        },
        Err(e) => {
            warn!(arguments = %raw, error = %e, "Malformed tool-call arguments");
            CallArguments::Malformed {
                raw: raw.to_string(),
                reason: format!("malformed arguments JSON: {}", e),
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
