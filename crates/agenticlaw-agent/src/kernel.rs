//! The agent kernel (C9): the ReAct driver. `run` is the only public
//! entry point — everything else in this crate exists to be called from
//! here.

use crate::executor::Executor;
use crate::evaluator::Evaluator;
use crate::planner::Planner;
use crate::session::{ExecutionState, SessionStore};
use agenticlaw_core::{Event, EvaluationKind, KernelError, Message, PlanStep};
use agenticlaw_tools::ToolRegistry;
use futures::Stream;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// The caller's answer to a previously emitted `user_input_request`.
#[derive(Clone, Debug, Default)]
pub struct ResumeInput {
    pub value: Option<Value>,
    pub selected_option: Option<String>,
    pub custom_value: Option<String>,
    pub cancelled: bool,
}

pub struct AgentKernel {
    store: Arc<dyn SessionStore>,
    registry: Arc<ToolRegistry>,
    planner: Planner,
    evaluator: Evaluator,
    executor: Executor,
    max_iterations: usize,
}

impl AgentKernel {
    pub fn new(
        store: Arc<dyn SessionStore>,
        registry: Arc<ToolRegistry>,
        planner: Planner,
        evaluator: Evaluator,
        executor: Executor,
    ) -> Self {
        Self { store, registry, planner, evaluator, executor, max_iterations: DEFAULT_MAX_ITERATIONS }
    }

    /// Drive one invocation. `message` is ignored when resuming a
    /// suspended session. Events are emitted in strict program order; the
    /// stream always ends with a `done` following a `text` or `error`.
    pub fn run(
        self: Arc<Self>,
        message: String,
        user_id: String,
        session_id: String,
        resume: Option<ResumeInput>,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Event> {
        async_stream::stream! {
            let session = agenticlaw_core::SessionKey::new(session_id);
            let run_id = uuid::Uuid::new_v4().to_string();

            if !self.acquire_lock(&session, &run_id, &cancel).await {
                yield Event::ErrorEvent(KernelError::SessionBusy(session.to_string()).to_payload());
                yield Event::Done {};
                return;
            }

            let outcome = self.run_inner(&session, &user_id, message, resume, &cancel).await;

            for event in outcome.events {
                yield event;
            }

            let _ = self.store.unlock(&session, &run_id).await;
        }
    }

    async fn acquire_lock(&self, session: &agenticlaw_core::SessionKey, run_id: &str, cancel: &CancellationToken) -> bool {
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(30);
        loop {
            match self.store.try_lock(session, run_id).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(_) => return false,
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::select! {
                _ = tokio::time::sleep(std::time::Duration::from_millis(200)) => {}
                _ = cancel.cancelled() => return false,
            }
        }
    }

    async fn run_inner(
        &self,
        session: &agenticlaw_core::SessionKey,
        user_id: &str,
        message: String,
        resume: Option<ResumeInput>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut events = Vec::new();

        let mut history = match self.store.load_log(session).await {
            Ok(log) => log,
            Err(_) => {
                events.push(Event::ErrorEvent(KernelError::MemoryIo("failed to load session log".into()).to_payload()));
                events.push(Event::Done {});
                return RunOutcome { events };
            }
        };

        let mut pending_plan: Option<(PlanStep, String)> = None;

        if let Some(resume) = resume {
            if resume.cancelled {
                events.push(Event::Text { content: "Okay, cancelled.".to_string() });
                events.push(Event::Done {});
                let _ = self.store.clear_state(session).await;
                return RunOutcome { events };
            }

            match self.store.load_state(session).await {
                Ok(Some(state)) => match merge_resume(state, &resume) {
                    MergeOutcome::Cancelled => {
                        events.push(Event::Text { content: "Okay, cancelled.".to_string() });
                        events.push(Event::Done {});
                        let _ = self.store.clear_state(session).await;
                        return RunOutcome { events };
                    }
                    MergeOutcome::Declined => {
                        events.push(Event::Text { content: "Okay, cancelled — I won't go ahead with that.".to_string() });
                        events.push(Event::Done {});
                        let _ = self.store.clear_state(session).await;
                        return RunOutcome { events };
                    }
                    MergeOutcome::Merged(plan, operation_id) => {
                        pending_plan = Some((plan, operation_id));
                    }
                },
                Ok(None) => {
                    tracing::warn!(%session, "resume received but no pending plan found");
                }
                Err(_) => {
                    events.push(Event::ErrorEvent(KernelError::MemoryIo("failed to load pending plan".into()).to_payload()));
                    events.push(Event::Done {});
                    return RunOutcome { events };
                }
            }
        } else {
            let user_message = Message::user(message);
            history.push(user_message.clone());
            if self.store.append_message(session, user_message).await.is_err() {
                events.push(Event::ErrorEvent(KernelError::MemoryIo("failed to append message".into()).to_payload()));
                events.push(Event::Done {});
                return RunOutcome { events };
            }
        }

        let mut iteration = 0usize;

        loop {
            if cancel.is_cancelled() {
                return RunOutcome { events };
            }

            if iteration >= self.max_iterations {
                events.push(Event::Text {
                    content: "I've truncated this run after reaching my step limit for the turn — let me know if you'd like me to continue.".to_string(),
                });
                events.push(Event::Done {});
                return RunOutcome { events };
            }
            iteration += 1;

            let (plan, operation_id) = if let Some(pending) = pending_plan.take() {
                pending
            } else {
                events.push(Event::Thinking { message: "planning next step".to_string() });
                let plan = self.planner.plan(&history, &self.registry).await;
                events.push(Event::Thought { content: plan.thought.clone() });
                let operation_id = uuid::Uuid::new_v4().to_string();
                (plan, operation_id)
            };

            let evaluation = self.evaluator.evaluate(&plan, &self.registry).await;

            if evaluation.needs_input {
                let target_parameter = evaluation.target_parameter.clone();
                let state = ExecutionState {
                    plan_step: serde_json::to_value(&plan).unwrap_or(Value::Null),
                    operation_id,
                    target_parameter: target_parameter.clone(),
                    updated_at: chrono::Utc::now(),
                };
                if self.store.save_state(session, state).await.is_err() {
                    events.push(Event::ErrorEvent(KernelError::MemoryIo("failed to persist pending plan".into()).to_payload()));
                    events.push(Event::Done {});
                    return RunOutcome { events };
                }
                events.push(Event::UserInputRequest {
                    kind: match evaluation.kind {
                        EvaluationKind::Confirm => "confirmation".to_string(),
                        EvaluationKind::Select => "selection".to_string(),
                        EvaluationKind::Input => "input".to_string(),
                        EvaluationKind::None => "input".to_string(),
                    },
                    question: evaluation.question.unwrap_or_default(),
                    options: evaluation.options,
                    default_value: None,
                    metadata: target_parameter.map(|p| serde_json::json!({ "target_parameter": p })),
                });
                return RunOutcome { events };
            }

            if plan.is_complete || plan.action.is_none() {
                let content = plan.thought.clone();
                events.push(Event::Text { content: content.clone() });
                events.push(Event::Done {});
                let assistant_message = Message::assistant(content);
                let _ = self.store.append_message(session, assistant_message).await;
                let _ = self.store.clear_state(session).await;
                return RunOutcome { events };
            }

            let action = plan.action.clone().unwrap();
            let args = plan.action_input.clone().unwrap_or(Value::Null);
            events.push(Event::Action { tool: action.clone(), message: plan.thought.clone() });

            let observation = match self
                .executor
                .execute(&self.registry, &action, args, user_id, &operation_id, cancel.clone())
                .await
            {
                Ok(observation) => observation,
                Err(KernelError::InsufficientCredits { required, available }) => {
                    events.push(Event::ErrorEvent(
                        KernelError::InsufficientCredits { required, available }.to_payload(),
                    ));
                    events.push(Event::Done {});
                    let _ = self.store.clear_state(session).await;
                    return RunOutcome { events };
                }
                // Cancellation closes the stream silently: no observation event,
                // nothing persisted, no `done` terminator (§7).
                Err(KernelError::Cancelled) => {
                    return RunOutcome { events };
                }
                Err(err) => {
                    events.push(Event::ErrorEvent(err.to_payload()));
                    events.push(Event::Done {});
                    let _ = self.store.clear_state(session).await;
                    return RunOutcome { events };
                }
            };

            events.push(Event::ObservationEvent {
                tool: observation.tool.clone(),
                success: observation.ok,
                result: observation.data.clone().unwrap_or(Value::Null),
                attempts: observation.attempts,
                attachments: None,
            });

            if self.store.record_observation(session, observation.clone()).await.is_err() {
                events.push(Event::ErrorEvent(KernelError::MemoryIo("failed to record observation".into()).to_payload()));
                events.push(Event::Done {});
                return RunOutcome { events };
            }

            let observation_message = Message::tool_result(
                observation.tool.clone(),
                serde_json::to_string(&observation.data).unwrap_or_default(),
            );
            history.push(observation_message.clone());
            let _ = self.store.append_message(session, observation_message).await;
            let _ = self.store.clear_state(session).await;
        }
    }
}

/// Merge a resumed HITL answer into the suspended `PlanStep`, per §4.9's
/// resume value-coercion rules. Pure function of the persisted state and the
/// caller's answer — no kernel state involved.
fn merge_resume(state: ExecutionState, resume: &ResumeInput) -> MergeOutcome {
    let Ok(mut plan) = serde_json::from_value::<PlanStep>(state.plan_step) else {
        return MergeOutcome::Cancelled;
    };

    // Confirm has no targeted parameter — the evaluator attached `confirm` to
    // the whole plan. Select/input carry the parameter name the suspended
    // `user_input_request` was asking about, persisted alongside the plan.
    let target_parameter = state.target_parameter;

    if let Some(selected) = &resume.selected_option {
        if selected == "__cancel__" {
            return MergeOutcome::Cancelled;
        }
        let value = if selected == "__other__" {
            match &resume.custom_value {
                Some(v) => v.clone(),
                None => return MergeOutcome::Cancelled,
            }
        } else {
            selected.clone()
        };
        write_into_action_input(&mut plan, target_parameter.as_deref(), &value);
        return MergeOutcome::Merged(plan, state.operation_id);
    }

    if target_parameter.is_none() {
        if let Some(value) = &resume.value {
            let truthy = match value {
                Value::Bool(b) => *b,
                Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "yes" | "y" | "confirm"),
                _ => false,
            };
            if matches!(value, Value::Bool(_)) || matches!(value, Value::String(_)) {
                if truthy {
                    return MergeOutcome::Merged(plan, state.operation_id);
                }
                return MergeOutcome::Declined;
            }
        }
    }

    if let Some(value) = resume.value.as_ref().and_then(Value::as_str).or(resume.custom_value.as_deref()) {
        write_into_action_input(&mut plan, target_parameter.as_deref(), value.trim());
        return MergeOutcome::Merged(plan, state.operation_id);
    }

    MergeOutcome::Declined
}

fn write_into_action_input(plan: &mut PlanStep, target_parameter: Option<&str>, value: &str) {
    let Some(target) = target_parameter else { return };
    let mut object = plan.action_input.take().unwrap_or_else(|| serde_json::json!({}));
    if let Some(map) = object.as_object_mut() {
        map.insert(target.to_string(), Value::String(value.to_string()));
    }
    plan.action_input = Some(object);
}

enum MergeOutcome {
    Cancelled,
    Declined,
    Merged(PlanStep, String),
}

struct RunOutcome {
    events: Vec<Event>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_with_truthy_string_proceeds() {
        let resume = ResumeInput { value: Some(Value::String("yes".into())), ..Default::default() };
        match resume.value {
            Some(Value::String(s)) => assert!(matches!(s.to_lowercase().as_str(), "true" | "yes" | "y" | "confirm")),
            _ => panic!("expected string value"),
        }
    }

    #[test]
    fn select_cancel_sentinel_is_recognized() {
        let resume = ResumeInput { selected_option: Some("__cancel__".to_string()), ..Default::default() };
        assert_eq!(resume.selected_option.as_deref(), Some("__cancel__"));
    }

    fn pending_state(action_input: Value, target_parameter: &str) -> ExecutionState {
        ExecutionState {
            plan_step: serde_json::to_value(PlanStep {
                thought: "generating an ad image".to_string(),
                action: Some("generate_ad_image".to_string()),
                action_input: Some(action_input),
                is_complete: false,
            })
            .unwrap(),
            operation_id: "op-1".to_string(),
            target_parameter: Some(target_parameter.to_string()),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn resume_with_other_custom_value_writes_target_parameter() {
        let state = pending_state(serde_json::json!({ "style": "x" }), "style");
        let resume = ResumeInput {
            selected_option: Some("__other__".to_string()),
            custom_value: Some("vaporwave".to_string()),
            ..Default::default()
        };
        match merge_resume(state, &resume) {
            MergeOutcome::Merged(plan, operation_id) => {
                assert_eq!(operation_id, "op-1");
                assert_eq!(plan.action_input.unwrap()["style"], "vaporwave");
            }
            _ => panic!("expected a merged plan"),
        }
    }

    #[test]
    fn resume_input_answer_writes_target_parameter_trimmed() {
        let state = pending_state(Value::Null, "product_info");
        let resume = ResumeInput { value: Some(Value::String("  wireless earbuds  ".to_string())), ..Default::default() };
        match merge_resume(state, &resume) {
            MergeOutcome::Merged(plan, _) => {
                assert_eq!(plan.action_input.unwrap()["product_info"], "wireless earbuds");
            }
            _ => panic!("expected a merged plan"),
        }
    }

    #[test]
    fn resume_select_cancel_sentinel_cancels_regardless_of_target() {
        let state = pending_state(serde_json::json!({ "style": "x" }), "style");
        let resume = ResumeInput { selected_option: Some("__cancel__".to_string()), ..Default::default() };
        assert!(matches!(merge_resume(state, &resume), MergeOutcome::Cancelled));
    }
}
