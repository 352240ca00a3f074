//! Model inference over an OpenAI-compatible chat completions API.
//!
//! Supports tool-use (function calling).

use super::{BackendError, ChatRequest, ModelBackend};
use crate::tools::ToolDefinition;
use crate::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// HTTP client for a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
    timeout: Duration,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolPayload<'a>>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: ChatRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolPayload<'a> {
    r#type: &'a str,
    function: FunctionPayload<'a>,
}

#[derive(Debug, Serialize)]
struct FunctionPayload<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallPayload>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallPayload {
    id: Option<String>,
    function: FunctionCallPayload,
}

#[derive(Debug, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl InferenceClient {
    /// Create a new inference client.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(60),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f64) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }

    /// Deadline applied to each request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        tools: &'a [ToolDefinition],
    ) -> CompletionRequest<'a> {
        let messages = messages
            .iter()
            .map(|m| MessagePayload {
                role: m.role,
                content: &m.content,
            })
            .collect();

        let tools = if tools.is_empty() {
            None
        } else {
            Some(
                tools
                    .iter()
                    .map(|t| ToolPayload {
                        r#type: "function",
                        function: FunctionPayload {
                            name: &t.name,
                            description: &t.description,
                            parameters: &t.parameters,
                        },
                    })
                    .collect(),
            )
        };

        CompletionRequest {
            model: &self.model,
            messages,
            tools,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Flatten the first choice of a completion into a [`ModelResponse`].
fn into_model_response(body: CompletionResponse) -> ModelResponse {
    let usage = body
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        })
        .unwrap_or_default();

    let Some(choice) = body.choices.into_iter().next() else {
        return ModelResponse {
            usage,
            ..ModelResponse::default()
        };
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| RawToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: tc.function.arguments,
        })
        .collect();

    ModelResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason: choice.finish_reason,
        usage,
    }
}

#[async_trait]
impl ModelBackend for InferenceClient {
    async fn chat(&self, request: ChatRequest) -> Result<ModelResponse, BackendError> {
        let payload = self.build_request(&request.messages, &request.tools);

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Inference request"
        );

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout(self.timeout)
                } else {
                    BackendError::Transport(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: CompletionResponse = resp
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let response = into_model_response(body);
        debug!(
            tool_calls = response.tool_calls.len(),
            finish_reason = ?response.finish_reason,
            total_tokens = response.usage.total_tokens,
            "Inference response"
        );
        Ok(response)
    }
}
