//! Execution engine: resolve each call against the registry, invoke it with
//! bounded retry, and produce exactly one outcome per call.

use crate::tools::{RegisteredTool, ToolError, ToolRegistry};
use crate::types::{CallArguments, CallOutcome, CallRequest};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Default total attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How failed invocations are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub backoff: Duration,
    /// Deadline for a single attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Duration::ZERO,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Outcomes of one decision, in request order, one per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionReport {
    outcomes: Vec<CallOutcome>,
}

impl ExecutionReport {
    pub fn outcomes(&self) -> &[CallOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<CallOutcome> {
        self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, call_id: &str) -> Option<&CallOutcome> {
        self.outcomes.iter().find(|o| o.call_id == call_id)
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(CallOutcome::is_success)
    }

    /// Outcomes keyed by tool name, ordered by first appearance.
    ///
    /// When several calls target the same tool, the later request's outcome
    /// replaces the earlier one in this view. The full list is still
    /// available through [`ExecutionReport::outcomes`].
    pub fn by_tool(&self) -> Vec<(&str, &CallOutcome)> {
        let mut view: Vec<(&str, &CallOutcome)> = Vec::new();
        for outcome in &self.outcomes {
            match view.iter_mut().find(|(name, _)| *name == outcome.tool_name) {
                Some(entry) => entry.1 = outcome,
                None => view.push((outcome.tool_name.as_str(), outcome)),
            }
        }
        view
    }
}

/// Runs call requests against a shared registry.
#[derive(Debug, Clone)]
pub struct Executor {
    registry: Arc<ToolRegistry>,
    policy: RetryPolicy,
    parallel: bool,
}

impl Executor {
    pub fn new(registry: Arc<ToolRegistry>, policy: RetryPolicy) -> Self {
        Self {
            registry,
            policy,
            parallel: false,
        }
    }

    /// Run the calls of one decision as concurrent tasks.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Execute every request. A failing call never affects its siblings.
    pub async fn execute(&self, calls: &[CallRequest]) -> ExecutionReport {
        let outcomes = if self.parallel && calls.len() > 1 {
            self.execute_parallel(calls).await
        } else {
            let mut outcomes = Vec::with_capacity(calls.len());
            for request in calls {
                outcomes.push(execute_call(&self.registry, self.policy, request).await);
            }
            outcomes
        };
        ExecutionReport { outcomes }
    }

    async fn execute_parallel(&self, calls: &[CallRequest]) -> Vec<CallOutcome> {
        let mut slots: Vec<Option<CallOutcome>> = vec![None; calls.len()];
        let mut tasks = JoinSet::new();

        for (index, request) in calls.iter().enumerate() {
            let registry = self.registry.clone();
            let policy = self.policy;
            let request = request.clone();
            tasks.spawn(async move { (index, execute_call(&registry, policy, &request).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!("Tool task failed to complete: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(calls)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| CallOutcome::error(request, "tool task aborted", 0))
            })
            .collect()
    }
}

/// Resolve, check and invoke a single request.
pub async fn execute_call(
    registry: &ToolRegistry,
    policy: RetryPolicy,
    request: &CallRequest,
) -> CallOutcome {
    if request.tool_name.is_empty() {
        warn!(call_id = %request.call_id, "Call names no tool");
        return CallOutcome::error(request, "tool '' not registered: the action names no tool", 0);
    }

    let Some(tool) = registry.resolve(&request.tool_name) else {
        warn!(tool = %request.tool_name, "Requested tool is not registered");
        return CallOutcome::error(
            request,
            format!("tool '{}' not registered", request.tool_name),
            0,
        );
    };

    let args = match &request.arguments {
        CallArguments::Decoded { values } => Some(values),
        // Rejected per attempt, like any other argument mismatch.
        CallArguments::NotAnObject { .. } => None,
        CallArguments::Malformed { reason, .. } => {
            warn!(tool = %request.tool_name, %reason, "Skipping call with undecodable arguments");
            return CallOutcome::error(request, reason.clone(), 0);
        }
    };

    invoke_with_retry(&tool, policy, request, args).await
}

async fn invoke_with_retry(
    tool: &RegisteredTool,
    policy: RetryPolicy,
    request: &CallRequest,
    args: Option<&Map<String, Value>>,
) -> CallOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        info!(tool = %tool.name(), attempt, max_attempts, "Executing tool");

        match invoke_once(tool, policy.attempt_timeout, args).await {
            Ok(value) => {
                info!(tool = %tool.name(), attempt, "Tool succeeded");
                return CallOutcome::success(request, value, attempt);
            }
            Err(e) => {
                error!(tool = %tool.name(), attempt, error = %e, "Tool attempt failed");
                last_error = e.to_string();
            }
        }

        if attempt < max_attempts && !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    CallOutcome::error(request, last_error, max_attempts)
}

async fn invoke_once(
    tool: &RegisteredTool,
    timeout: Option<Duration>,
    args: Option<&Map<String, Value>>,
) -> Result<Value, ToolError> {
    let args = args.ok_or(ToolError::ArgumentsNotObject)?;
    match timeout {
        Some(after) => tokio::time::timeout(after, tool.invoke(args))
            .await
            .unwrap_or(Err(ToolError::Timeout { after })),
        None => tool.invoke(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{builtin_registry, FnTool, ParamType, Tool, ToolArgs, ToolDescriptor};
    use crate::types::OutcomeStatus;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails until the configured attempt number, counting every call.
    struct Flaky {
        descriptor: ToolDescriptor,
        succeed_on: u32,
        calls: Arc<AtomicU32>,
    }

    impl Flaky {
        fn new(name: &str, succeed_on: u32) -> (Self, Arc<AtomicU32>) {
            let calls = Arc::new(AtomicU32::new(0));
            let tool = Self {
                descriptor: ToolDescriptor::new(name, "flaky tool"),
                succeed_on,
                calls: calls.clone(),
            };
            (tool, calls)
        }
    }

    #[async_trait]
    impl Tool for Flaky {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: ToolArgs<'_>) -> Result<Value, ToolError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(json!(format!("ok on {}", n)))
            } else {
                Err(ToolError::failed(format!("boom {}", n)))
            }
        }
    }

    struct Slow {
        descriptor: ToolDescriptor,
    }

    #[async_trait]
    impl Tool for Slow {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _args: ToolArgs<'_>) -> Result<Value, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    fn request(tool: &str, args: Value) -> CallRequest {
        CallRequest::new(tool, args.as_object().cloned().unwrap_or_default())
    }

    fn executor(registry: ToolRegistry) -> Executor {
        Executor::new(Arc::new(registry), RetryPolicy::default())
    }

    #[tokio::test]
    async fn unknown_tool_is_error_without_attempts() {
        let (flaky, calls) = Flaky::new("flaky", 1);
        let mut registry = ToolRegistry::new();
        registry.register(flaky).unwrap();

        let report = executor(registry)
            .execute(&[request("subtract", json!({}))])
            .await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.status(), OutcomeStatus::Error);
        assert_eq!(outcome.attempts_used, 0);
        assert!(outcome.error_message().unwrap().contains("not registered"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn always_failing_tool_uses_three_attempts() {
        let (flaky, calls) = Flaky::new("flaky", u32::MAX);
        let mut registry = ToolRegistry::new();
        registry.register(flaky).unwrap();

        let report = executor(registry).execute(&[request("flaky", json!({}))]).await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.status(), OutcomeStatus::Error);
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(outcome.error_message(), Some("boom 3"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn success_on_attempt_k_stops_retrying() {
        for k in 1..=3 {
            let (flaky, calls) = Flaky::new("flaky", k);
            let mut registry = ToolRegistry::new();
            registry.register(flaky).unwrap();

            let report = executor(registry).execute(&[request("flaky", json!({}))]).await;

            let outcome = &report.outcomes()[0];
            assert!(outcome.is_success());
            assert_eq!(outcome.attempts_used, k);
            assert_eq!(calls.load(Ordering::SeqCst), k);
        }
    }

    #[tokio::test]
    async fn argument_mismatch_is_retried_then_reported() {
        let report = executor(builtin_registry().unwrap())
            .execute(&[request("add", json!({"a": 3, "b": "five"}))])
            .await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(
            outcome.error_message(),
            Some("argument 'b' must be of type integer")
        );
    }

    #[tokio::test]
    async fn malformed_arguments_skip_invocation() {
        let (flaky, calls) = Flaky::new("flaky", 1);
        let mut registry = ToolRegistry::new();
        registry.register(flaky).unwrap();
        let bad = CallRequest {
            call_id: "c1".into(),
            tool_name: "flaky".into(),
            arguments: CallArguments::Malformed {
                raw: "{".into(),
                reason: "malformed arguments JSON".into(),
            },
        };

        let report = executor(registry)
            .execute(&[bad, request("flaky", json!({}))])
            .await;

        assert_eq!(report.outcomes()[0].attempts_used, 0);
        assert_eq!(
            report.outcomes()[0].error_message(),
            Some("malformed arguments JSON")
        );
        assert!(report.outcomes()[1].is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_object_arguments_fail_every_attempt() {
        let (flaky, calls) = Flaky::new("flaky", 1);
        let mut registry = ToolRegistry::new();
        registry.register(flaky).unwrap();
        let list = CallRequest {
            call_id: "c1".into(),
            tool_name: "flaky".into(),
            arguments: CallArguments::NotAnObject {
                value: json!([3, 5]),
            },
        };

        let report = executor(registry).execute(&[list]).await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.attempts_used, 3);
        assert_eq!(
            outcome.error_message(),
            Some("arguments must be a JSON object")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_tool_name_is_not_registered() {
        let report = executor(builtin_registry().unwrap())
            .execute(&[request("", json!({"a": 3}))])
            .await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.attempts_used, 0);
        assert!(outcome.error_message().unwrap().contains("not registered"));
    }

    #[tokio::test]
    async fn failures_do_not_abort_siblings() {
        let report = executor(builtin_registry().unwrap())
            .execute(&[
                request("missing", json!({})),
                request("add", json!({"a": 3, "b": 5})),
                request("add", json!({"a": 1})),
            ])
            .await;

        assert_eq!(report.len(), 3);
        assert!(!report.outcomes()[0].is_success());
        assert_eq!(report.outcomes()[1].value(), Some(&json!(8)));
        assert!(!report.outcomes()[2].is_success());
        assert!(!report.all_succeeded());
    }

    #[tokio::test]
    async fn by_tool_view_is_last_writer_wins() {
        let first = request("add", json!({"a": 1, "b": 1}));
        let second = request("add", json!({"a": 2, "b": 2}));
        let report = executor(builtin_registry().unwrap())
            .execute(&[first.clone(), second.clone()])
            .await;

        let view = report.by_tool();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].0, "add");
        assert_eq!(view[0].1.call_id, second.call_id);
        assert_eq!(report.get(&first.call_id).unwrap().value(), Some(&json!(2)));
    }

    #[tokio::test]
    async fn parallel_execution_keeps_request_order() {
        let mut registry = builtin_registry().unwrap();
        registry
            .register(FnTool::new(
                ToolDescriptor::new("echo", "Echo text.").param("text", ParamType::String),
                |args| Ok(json!(args.str("text")?)),
            ))
            .unwrap();
        let exec = Executor::new(Arc::new(registry), RetryPolicy::default()).parallel(true);

        let calls: Vec<CallRequest> = (0..8)
            .map(|i| request("echo", json!({"text": format!("t{}", i)})))
            .collect();
        let report = exec.execute(&calls).await;

        assert_eq!(report.len(), 8);
        for (i, (outcome, call)) in report.outcomes().iter().zip(&calls).enumerate() {
            assert_eq!(outcome.call_id, call.call_id);
            assert_eq!(outcome.value(), Some(&json!(format!("t{}", i))));
        }
    }

    #[tokio::test]
    async fn attempt_timeout_counts_as_failure() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Slow {
                descriptor: ToolDescriptor::new("slow", "never finishes in time"),
            })
            .unwrap();
        let policy = RetryPolicy::new(2).with_attempt_timeout(Some(Duration::from_millis(20)));

        let report = Executor::new(Arc::new(registry), policy)
            .execute(&[request("slow", json!({}))])
            .await;

        let outcome = &report.outcomes()[0];
        assert_eq!(outcome.attempts_used, 2);
        assert!(outcome.error_message().unwrap().contains("timed out"));
    }

    #[test]
    fn zero_attempts_is_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }
}
