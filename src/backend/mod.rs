//! Model backend boundary.
//!
//! The agent only needs one request/response call: send the conversation
//! (and optionally the tool definitions), get back text and/or tool calls.

pub mod inference;
pub mod mock;

pub use inference::InferenceClient;
pub use mock::MockBackend;

use crate::config::{AgentConfig, BackendKind};
use crate::tools::ToolDefinition;
use crate::types::{ChatMessage, ModelResponse};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// One request to the model backend.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Empty means no tool schema is attached.
    pub tools: Vec<ToolDefinition>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("backend call exceeded {0:?}")]
    Timeout(Duration),

    #[error("backend has no more responses")]
    Exhausted,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ModelResponse, BackendError>;
}

/// Build the backend selected by `config`.
pub fn from_config(config: &AgentConfig) -> Arc<dyn ModelBackend> {
    match config.backend {
        BackendKind::Mock => Arc::new(MockBackend::new()),
        BackendKind::Http => {
            let mut client = InferenceClient::new(&config.api_base, &config.api_key, &config.model)
                .with_sampling(config.max_tokens, config.temperature);
            if let Some(timeout) = config.request_timeout() {
                client = client.with_timeout(timeout);
            }
            Arc::new(client)
        }
    }
}
