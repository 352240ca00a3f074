//! Session orchestrator: one user request → one decision → execution →
//! one summary, then back to a fresh conversation.

use crate::agent::decision::{extract_decision, Decision};
use crate::agent::executor::{Executor, RetryPolicy};
use crate::agent::prompt::{build_system_prompt, summary_transcript};
use crate::backend::{BackendError, ChatRequest, ModelBackend};
use crate::config::AgentConfig;
use crate::tools::ToolRegistry;
use crate::types::{CallOutcome, ChatMessage, ModelResponse};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Reply returned when the model did not produce a usable action.
pub const NO_DECISION_REPLY: &str = "The agent could not produce a valid action for this request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    DecisionPending,
    Executing,
    Summarizing,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::DecisionPending => write!(f, "decision_pending"),
            Self::Executing => write!(f, "executing"),
            Self::Summarizing => write!(f, "summarizing"),
        }
    }
}

/// Conversation state: the fixed system message plus the current cycle.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop everything but the system message.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }

    pub fn is_initial(&self) -> bool {
        self.messages.len() == 1
    }
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub reply: String,
    pub decision: Option<Decision>,
    pub outcomes: Vec<CallOutcome>,
}

impl CycleReport {
    fn no_decision() -> Self {
        Self {
            reply: NO_DECISION_REPLY.to_string(),
            decision: None,
            outcomes: Vec::new(),
        }
    }
}

/// Owns the conversation and drives the single-cycle pipeline.
pub struct Session {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    executor: Executor,
    conversation: Conversation,
    phase: SessionPhase,
    backend_timeout: Option<Duration>,
}

impl Session {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        let executor = Executor::new(registry.clone(), RetryPolicy::default());
        Self {
            backend,
            registry,
            executor,
            conversation: Conversation::new(system_prompt),
            phase: SessionPhase::Idle,
            backend_timeout: None,
        }
    }

    /// Build a session using the retry, deadline and prompt settings of `config`.
    pub fn from_config(
        config: &AgentConfig,
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
    ) -> Self {
        let system_prompt =
            build_system_prompt(&config.system_prompt, config.decision_format, &registry);
        Self::new(backend, registry, system_prompt)
            .with_retry_policy(config.retry_policy())
            .with_parallel_calls(config.parallel_calls)
            .with_backend_timeout(config.request_timeout())
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.executor = Executor::new(self.registry.clone(), policy);
        self
    }

    pub fn with_parallel_calls(mut self, parallel: bool) -> Self {
        self.executor = self.executor.parallel(parallel);
        self
    }

    /// Deadline applied to each backend call.
    pub fn with_backend_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Run one full cycle for `input`.
    ///
    /// Only a backend failure returns `Err`. The conversation is back to its
    /// initial single-message form afterwards in every case.
    pub async fn handle(&mut self, input: &str) -> Result<CycleReport, BackendError> {
        if !self.conversation.is_initial() {
            // A previous cycle was dropped mid-flight.
            warn!("Discarding leftover conversation state");
            self.conversation.reset();
        }

        let result = self.run_cycle(input).await;
        self.conversation.reset();
        self.transition(SessionPhase::Idle);

        if let Err(ref e) = result {
            warn!(error = %e, "Cycle aborted by backend failure");
        }
        result
    }

    async fn run_cycle(&mut self, input: &str) -> Result<CycleReport, BackendError> {
        info!("User input: {}", input);

        self.transition(SessionPhase::DecisionPending);
        self.conversation.push(ChatMessage::user(input));
        let request = ChatRequest::new(self.conversation.messages().to_vec())
            .with_tools(self.registry.definitions());
        let response = self.call_backend(request).await?;

        let Some(decision) = extract_decision(&response) else {
            warn!("No actionable decision produced");
            return Ok(CycleReport::no_decision());
        };
        info!(source = ?decision.source, calls = decision.calls.len(), "Thought: {}", decision.rationale);

        self.transition(SessionPhase::Executing);
        let report = self.executor.execute(&decision.calls).await;
        for outcome in report.outcomes() {
            info!(
                tool = %outcome.tool_name,
                status = %outcome.status(),
                attempts = outcome.attempts_used,
                "Observation"
            );
        }

        self.transition(SessionPhase::Summarizing);
        self.conversation.push(ChatMessage::assistant(summary_transcript(
            &decision.rationale,
            report.outcomes(),
        )));
        let request = ChatRequest::new(self.conversation.messages().to_vec());
        let summary = self.call_backend(request).await?;

        let reply = summary.content.unwrap_or_default();
        info!("Final reply: {}", reply);

        Ok(CycleReport {
            reply,
            decision: Some(decision),
            outcomes: report.into_outcomes(),
        })
    }

    async fn call_backend(&self, request: ChatRequest) -> Result<ModelResponse, BackendError> {
        debug!(phase = %self.phase, messages = request.messages.len(), "Calling model backend");
        match self.backend_timeout {
            Some(after) => tokio::time::timeout(after, self.backend.chat(request))
                .await
                .unwrap_or(Err(BackendError::Timeout(after))),
            None => self.backend.chat(request).await,
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = %self.phase, to = %next, "Session phase");
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_reset_keeps_only_system_message() {
        let mut conv = Conversation::new("sys");
        conv.push(ChatMessage::user("hello"));
        conv.push(ChatMessage::assistant("hi"));
        assert!(!conv.is_initial());

        conv.reset();

        assert!(conv.is_initial());
        assert_eq!(conv.messages(), &[ChatMessage::system("sys")]);
    }
}
