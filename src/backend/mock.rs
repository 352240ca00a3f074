//! Offline backend that answers without any network access.
//!
//! Decision requests (tools attached) are answered in the marker format,
//! routed by keyword. Summary requests are answered by rendering the
//! outcomes recorded in the last assistant turn.

use super::{BackendError, ChatRequest, ModelBackend};
use crate::agent::prompt::outcomes_from_transcript;
use crate::types::{CallOutcome, CallResult, ChatRole, ModelResponse};
use async_trait::async_trait;
use tracing::debug;

const WEATHER_DECISION: &str = r#"Thought: The user wants to know the weather in Beijing, so I should call the weather tool.
Action: {"tool": "get_weather", "parameters": {"city": "Beijing"}}
Observation: "#;

const ADD_DECISION: &str = r#"Thought: The user wants to compute 3 + 5, so I should use the calculator.
Action: {"tool": "add", "parameters": {"a": 3, "b": 5}}
Observation: "#;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    fn decide(&self, request: &ChatRequest) -> ModelResponse {
        let input = last_content(request, ChatRole::User)
            .unwrap_or_default()
            .to_lowercase();
        if input.contains("天气") || input.contains("weather") {
            ModelResponse::text(WEATHER_DECISION)
        } else {
            ModelResponse::text(ADD_DECISION)
        }
    }

    fn summarize(&self, request: &ChatRequest) -> ModelResponse {
        let outcomes = last_content(request, ChatRole::Assistant)
            .and_then(outcomes_from_transcript)
            .unwrap_or_default();

        if outcomes.is_empty() {
            return ModelResponse::text("Unable to interpret the execution result.");
        }

        let lines: Vec<String> = outcomes.iter().map(render_outcome).collect();
        ModelResponse::text(lines.join("\n"))
    }
}

fn last_content(request: &ChatRequest, role: ChatRole) -> Option<&str> {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == role)
        .map(|m| m.content.as_str())
}

fn render_outcome(outcome: &CallOutcome) -> String {
    match &outcome.result {
        CallResult::Success { result } => match result.as_str() {
            Some(text) => format!("Operation succeeded, result: {}", text),
            None => format!("Operation succeeded, result: {}", result),
        },
        CallResult::Error { message } => format!("Operation failed: {}", message),
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ModelResponse, BackendError> {
        let response = if request.tools.is_empty() {
            self.summarize(&request)
        } else {
            self.decide(&request)
        };
        debug!(chars = response.content.as_deref().map_or(0, str::len), "Mock response");
        Ok(response)
    }
}
