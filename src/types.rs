//! Shared types used across the agent runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A chat message in the conversation sent to the model backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend responses
// ---------------------------------------------------------------------------

/// A tool-call entry exactly as the backend returned it.
///
/// `arguments` stays a raw JSON string so a malformed payload only fails
/// the call it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub arguments: String,
}

/// Response from the model backend: free text, structured tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<RawToolCall>,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// A plain-text response with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some("stop".into()),
            ..Self::default()
        }
    }
}

/// Token usage from an inference call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Calls and outcomes
// ---------------------------------------------------------------------------

/// Arguments of a call request, as far as the extractor could decode them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallArguments {
    Decoded { values: Map<String, Value> },
    /// Parsed JSON that is not an object; rejected on each invocation attempt.
    NotAnObject { value: Value },
    /// Argument text that could not be decoded at all.
    Malformed { raw: String, reason: String },
}

impl CallArguments {
    pub fn decoded(values: Map<String, Value>) -> Self {
        Self::Decoded { values }
    }
}

/// A normalized request to run one registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: CallArguments,
}

impl CallRequest {
    /// Build a request with decoded arguments and a fresh call id.
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            call_id: new_call_id(),
            tool_name: tool_name.into(),
            arguments: CallArguments::decoded(arguments),
        }
    }
}

/// Generate a unique call identifier.
pub fn new_call_id() -> String {
    format!("call_{}", ulid::Ulid::new())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// What happened to one call: a value or the last failure message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallResult {
    Success { result: Value },
    Error { message: String },
}

/// The normalized result of executing one call request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub call_id: String,
    pub tool_name: String,
    #[serde(flatten)]
    pub result: CallResult,
    /// Handle invocations performed; 0 when the handle was never reached.
    pub attempts_used: u32,
}

impl CallOutcome {
    pub fn success(request: &CallRequest, result: Value, attempts_used: u32) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            result: CallResult::Success { result },
            attempts_used,
        }
    }

    pub fn error(request: &CallRequest, message: impl Into<String>, attempts_used: u32) -> Self {
        Self {
            call_id: request.call_id.clone(),
            tool_name: request.tool_name.clone(),
            result: CallResult::Error {
                message: message.into(),
            },
            attempts_used,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self.result {
            CallResult::Success { .. } => OutcomeStatus::Success,
            CallResult::Error { .. } => OutcomeStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == OutcomeStatus::Success
    }

    pub fn value(&self) -> Option<&Value> {
        match &self.result {
            CallResult::Success { result } => Some(result),
            CallResult::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.result {
            CallResult::Success { .. } => None,
            CallResult::Error { message } => Some(message),
        }
    }
}
