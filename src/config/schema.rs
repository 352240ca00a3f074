//! Configuration schema for agent.toml.

use crate::agent::executor::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::agent::prompt::DEFAULT_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which model backend serves the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions endpoint.
    #[default]
    Http,
    /// Offline keyword-routed backend.
    Mock,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

/// How the model is asked to express its decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionFormat {
    /// Native tool calls.
    #[default]
    Structured,
    /// `Thought:` / `Action:` / `Observation:` text, described in the system prompt.
    Marker,
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Backend endpoint (base URL of the chat completions API).
    pub api_base: String,

    /// Backend credential.
    pub api_key: String,

    /// Model name sent with every request.
    pub model: String,

    pub backend: BackendKind,

    pub decision_format: DecisionFormat,

    /// The fixed system preamble every cycle starts from.
    pub system_prompt: String,

    /// Total invocation attempts per tool call.
    pub max_attempts: u32,

    /// Pause between attempts, in milliseconds.
    pub retry_backoff_ms: u64,

    /// Deadline per tool attempt in seconds (0 disables it).
    pub tool_timeout_secs: u64,

    /// Deadline per backend call in seconds (0 disables it).
    pub request_timeout_secs: u64,

    /// Execute the calls of one decision concurrently.
    pub parallel_calls: bool,

    pub max_tokens: u32,

    pub temperature: f64,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_base: "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
            api_key: String::new(),
            model: "qwen-plus".into(),
            backend: BackendKind::Http,
            decision_format: DecisionFormat::Structured,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff_ms: 0,
            tool_timeout_secs: 30,
            request_timeout_secs: 60,
            parallel_calls: false,
            max_tokens: 1024,
            temperature: 0.7,
            log_level: "info".into(),
        }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl AgentConfig {
    /// Retry policy for the execution engine.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .with_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_attempt_timeout(secs(self.tool_timeout_secs))
    }

    /// Deadline for a single backend call.
    pub fn request_timeout(&self) -> Option<Duration> {
        secs(self.request_timeout_secs)
    }
}
