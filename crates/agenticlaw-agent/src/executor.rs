//! The executor (C8): runs one approved plan step through the credit gate
//! and retry policy, and always returns an [`Observation`] — it never
//! re-raises a tool's own failure to the kernel.

use crate::credit::CreditGate;
use agenticlaw_core::{retry_with_backoff, KernelError, Observation, RetryPolicy};
use agenticlaw_tools::{ToolRegistry, ToolResult};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub struct Executor {
    credit_gate: CreditGate,
    retry_policy: RetryPolicy,
}

impl Executor {
    pub fn new(credit_gate: CreditGate, retry_policy: RetryPolicy) -> Self {
        Self { credit_gate, retry_policy }
    }

    /// Run `tool_name(args)`, pre-checking/deducting credit around a
    /// retried tool invocation. `operation_id` is stable across retries
    /// (and, by the caller reusing the same value, across a HITL
    /// suspend/resume of the same plan step).
    pub async fn execute(
        &self,
        registry: &ToolRegistry,
        tool_name: &str,
        args: Value,
        user_id: &str,
        operation_id: &str,
        cancel: CancellationToken,
    ) -> Result<Observation, KernelError> {
        let tool = registry.get(tool_name).ok_or_else(|| KernelError::UnknownTool(tool_name.to_string()))?;
        let credit_cost = registry.descriptor(tool_name).and_then(|d| d.credit_cost);
        let policy = self.retry_policy.clone();

        let gated: Result<(ToolResult, u32), KernelError> = self
            .credit_gate
            .run(user_id, credit_cost, operation_id, move || async move {
                retry_with_backoff(policy, Some(&cancel), move || {
                    let tool = tool.clone();
                    let args = args.clone();
                    let cancel = cancel.clone();
                    async move {
                        let result = tool.execute_cancellable(args, cancel.clone()).await;
                        // A tool cancelled mid-call reports through its own
                        // ToolResult::Error channel; if the token actually fired,
                        // that's a cancellation, not a tool failure.
                        if cancel.is_cancelled() {
                            return Err(KernelError::Cancelled);
                        }
                        match result {
                            ToolResult::Error(message) => {
                                Err(KernelError::BackendToolError { code: "tool_error".into(), message, retryable: false })
                            }
                            other => Ok(other),
                        }
                    }
                })
                .await
            })
            .await;

        match gated {
            Ok((tool_result, attempts)) => Ok(Observation::success(tool_name, tool_result.to_value(), attempts)),
            Err(KernelError::InsufficientCredits { required, available }) => {
                Err(KernelError::InsufficientCredits { required, available })
            }
            // Cancellation is not a tool failure: no observation is recorded for it,
            // it terminates the run silently (§7).
            Err(KernelError::Cancelled) => Err(KernelError::Cancelled),
            Err(err) => Ok(Observation::failure(tool_name, err.to_payload(), 1)),
        }
    }
}
