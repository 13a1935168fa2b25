//! The planner (C6): turns conversation state into exactly one [`PlanStep`]
//! per kernel iteration via a single structured LLM call.

use agenticlaw_core::{Message, PlanStep};
use agenticlaw_llm::{structured_call, LlmProvider};
use agenticlaw_tools::ToolRegistry;
use serde::Deserialize;
use std::sync::Arc;

const HISTORY_WINDOW: usize = 20;

#[derive(Deserialize)]
struct RawPlanStep {
    thought: String,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    action_input: Option<serde_json::Value>,
    #[serde(default)]
    is_complete: bool,
}

pub struct Planner {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl Planner {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self { provider, model: model.into() }
    }

    /// Build exactly one `PlanStep`. Never errors outward: a planner/parse
    /// failure becomes a graceful `is_complete=true` apology instead, per
    /// the kernel's "planner failure never surfaces `error`" rule.
    pub async fn plan(&self, history: &[Message], registry: &ToolRegistry) -> PlanStep {
        let system = self.build_system_prompt(registry);
        let prompt = self.build_prompt(history);

        let result = structured_call::<RawPlanStep>(
            &self.provider,
            &self.model,
            &system,
            r#"{"thought": "string", "action": "string|null", "action_input": {}, "is_complete": false}"#,
            &prompt,
        )
        .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "planner failed to produce a parseable plan");
                return PlanStep::complete("Sorry, I wasn't able to figure out the next step there.");
            }
        };

        match &raw.action {
            Some(tool_name) if registry.get(tool_name).is_none() => {
                tracing::warn!(tool = %tool_name, "planner named an unknown tool, terminating");
                PlanStep::complete(format!(
                    "I tried to use a tool called '{tool_name}' that doesn't exist, so I'm stopping here: {}",
                    raw.thought
                ))
            }
            _ => PlanStep {
                action: raw.action,
                action_input: raw.action_input,
                thought: raw.thought,
                is_complete: raw.is_complete,
            },
        }
    }

    fn build_system_prompt(&self, registry: &ToolRegistry) -> String {
        let mut listing = String::new();
        for descriptor in registry.descriptors() {
            listing.push_str(&format!("- {}: {}\n", descriptor.name, descriptor.description));
        }
        format!(
            "You are an ad-campaign assistant. Decide the next single step. \
             Available tools:\n{listing}\n\
             Respond with exactly one JSON object: thought, action (tool name or null), \
             action_input (object), is_complete (true once no more tool calls are needed)."
        )
    }

    fn build_prompt(&self, history: &[Message]) -> String {
        let window: Vec<&Message> = history.iter().rev().take(HISTORY_WINDOW).rev().collect();
        let mut prompt = String::new();
        for message in window {
            prompt.push_str(&format!("{:?}: {}\n", message.role, message.content));
        }
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_plan_step_deserializes_minimal_shape() {
        let raw: RawPlanStep = serde_json::from_str(r#"{"thought": "done", "is_complete": true}"#).unwrap();
        assert_eq!(raw.thought, "done");
        assert!(raw.is_complete);
        assert!(raw.action.is_none());
    }
}
