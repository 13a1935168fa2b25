//! The evaluator (C7): decides whether a planned action can auto-proceed or
//! needs a human-in-the-loop round trip, per the fixed decision table in
//! the kernel's design. First-match-wins; later rows never override an
//! earlier row's positive.

use agenticlaw_core::{Evaluation, EvaluationKind, PlanStep, SelectOption};
use agenticlaw_llm::{structured_call, LlmProvider};
use agenticlaw_tools::ToolRegistry;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Read-only utilities: never need confirmation regardless of parameters.
const AUTO_APPROVE_SET: &[&str] = &[
    "get_current_datetime",
    "calculator",
    "web_search",
    "get_account_balance",
    "get_campaign_reports",
    "get_performance_summary",
];

/// Campaign/account mutations: always confirmed, independent of amount.
const HIGH_RISK_SET: &[&str] = &[
    "create_campaign",
    "update_campaign",
    "pause_campaign",
    "delete_campaign",
    "disconnect_account",
    "update_budget",
];

/// Actions whose `budget`/`daily_budget` parameter is checked against the
/// spending threshold. Note this overlaps with `HIGH_RISK_SET` — both rows
/// independently produce `confirm`, so the overlap is harmless.
const SPENDING_SET: &[&str] = &["create_campaign", "update_budget"];

const AMBIGUOUS_PARAMS: &[&str] = &["style", "template", "targeting", "objective", "placement"];
const AMBIGUOUS_MIN_LEN: usize = 10;
const CLARITY_THRESHOLD: f64 = 0.9;

fn preset_options(param: &str) -> Vec<SelectOption> {
    let presets: &[&str] = match param {
        "style" => &["photorealistic", "illustration", "minimalist", "vibrant", "corporate"],
        "objective" => &["awareness", "traffic", "conversions", "engagement"],
        "template" => &["hero_cta", "long_form", "product_grid"],
        "targeting" => &["lookalike_audience", "interest_based", "retargeting", "broad"],
        "placement" => &["feed", "stories", "search", "display"],
        _ => &[],
    };
    let mut options: Vec<SelectOption> =
        presets.iter().map(|p| SelectOption::new(*p, titlecase(p))).collect();
    options.push(SelectOption::other());
    options.push(SelectOption::cancel());
    options
}

fn titlecase(s: &str) -> String {
    s.replace('_', " ")
        .split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn missing_parameter_question(param: &str) -> String {
    match param {
        "product_info" => "What product or offer is this for?".to_string(),
        "name" => "What should this be named?".to_string(),
        "budget" | "daily_budget" => "What budget should be used?".to_string(),
        "url" => "What URL should this point to?".to_string(),
        "content" => "What content should this use?".to_string(),
        other => format!("Please provide a value for {other}."),
    }
}

fn is_missing_or_empty(args: &Value, param: &str) -> bool {
    match args.get(param) {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

fn spending_amount(args: &Value) -> Option<f64> {
    args.get("budget")
        .or_else(|| args.get("daily_budget"))
        .and_then(Value::as_f64)
}

fn find_ambiguous_parameter(args: &Value) -> Option<&'static str> {
    AMBIGUOUS_PARAMS.iter().find(|param| {
        args.get(**param)
            .and_then(Value::as_str)
            .is_some_and(|v| v.trim().len() < AMBIGUOUS_MIN_LEN)
    }).copied()
}

#[derive(Deserialize)]
struct ClarityVerdict {
    clarity: f64,
    #[allow(dead_code)]
    reason: String,
}

pub struct Evaluator {
    provider: Arc<dyn LlmProvider>,
    model: String,
    spending_threshold_usd: f64,
}

impl Evaluator {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, spending_threshold_usd: f64) -> Self {
        Self { provider, model: model.into(), spending_threshold_usd }
    }

    pub async fn evaluate(&self, plan: &PlanStep, registry: &ToolRegistry) -> Evaluation {
        if plan.is_complete || plan.action.is_none() {
            return Evaluation::none();
        }
        let action = plan.action.as_deref().unwrap();
        let args = plan.action_input.clone().unwrap_or(Value::Null);

        if AUTO_APPROVE_SET.contains(&action) {
            return Evaluation::none();
        }

        if HIGH_RISK_SET.contains(&action) {
            return self.confirm(plan);
        }

        if registry.descriptor(action).is_some_and(|d| d.requires_confirmation) {
            return self.confirm(plan);
        }

        if SPENDING_SET.contains(&action) {
            if let Some(amount) = spending_amount(&args) {
                if amount > self.spending_threshold_usd {
                    return self.confirm(plan);
                }
            }
        }

        if let Some(descriptor) = registry.descriptor(action) {
            for required in descriptor.required_parameters() {
                if is_missing_or_empty(&args, required) {
                    return Evaluation {
                        needs_input: true,
                        kind: EvaluationKind::Input,
                        question: Some(missing_parameter_question(required)),
                        options: None,
                        suggested_action: None,
                        reason: Some(format!("missing required parameter: {required}")),
                        target_parameter: Some(required.to_string()),
                    };
                }
            }
        }

        if let Some(param) = find_ambiguous_parameter(&args) {
            return Evaluation {
                needs_input: true,
                kind: EvaluationKind::Select,
                question: Some(format!("Which {param} would you like to use?")),
                options: Some(preset_options(param)),
                suggested_action: None,
                reason: Some(format!("parameter '{param}' is too generic to act on")),
                target_parameter: Some(param.to_string()),
            };
        }

        match self.clarity_check(&args).await {
            Some((parameter, clarity)) if clarity < CLARITY_THRESHOLD => Evaluation {
                needs_input: true,
                kind: EvaluationKind::Select,
                question: Some(format!("Can you clarify '{parameter}'?")),
                options: Some(vec![SelectOption::other(), SelectOption::cancel()]),
                suggested_action: None,
                reason: Some("clarity check below threshold".to_string()),
                target_parameter: Some(parameter),
            },
            _ => Evaluation::none(),
        }
    }

    fn confirm(&self, plan: &PlanStep) -> Evaluation {
        Evaluation {
            needs_input: true,
            kind: EvaluationKind::Confirm,
            question: Some(format!(
                "Proceed with {}?",
                plan.action.as_deref().unwrap_or("this action")
            )),
            options: None,
            suggested_action: Some(serde_json::to_value(plan).unwrap_or(Value::Null)),
            reason: Some("action requires confirmation before running".to_string()),
            target_parameter: None,
        }
    }

    /// Ask the model how confident it is that the most string-like
    /// parameter in `args` is unambiguous. Fails open on any provider
    /// error: returns `None`, which `evaluate` treats as "proceed".
    async fn clarity_check(&self, args: &Value) -> Option<(String, f64)> {
        let Some(object) = args.as_object() else { return None };
        let parameter = object.iter().find_map(|(k, v)| v.as_str().map(|_| k.clone()))?;
        let value = object.get(&parameter)?.as_str()?;

        let prompt = format!(
            "Parameter '{parameter}' has value '{value}'. How clear and unambiguous is this value for proceeding without asking the user? Respond with clarity between 0 and 1."
        );
        let result = structured_call::<ClarityVerdict>(
            &self.provider,
            &self.model,
            "You judge whether a parameter value is clear enough to act on without confirmation.",
            r#"{"clarity": 0.0, "reason": "string"}"#,
            &prompt,
        )
        .await;

        match result {
            Ok(verdict) => Some((parameter, verdict.clarity)),
            Err(e) => {
                tracing::warn!(error = %e, "clarity check failed, proceeding (fail open)");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_approve_set_contains_datetime_and_calculator() {
        assert!(AUTO_APPROVE_SET.contains(&"get_current_datetime"));
        assert!(AUTO_APPROVE_SET.contains(&"calculator"));
    }

    #[test]
    fn ambiguous_parameter_detects_short_style_value() {
        let args = serde_json::json!({ "style": "cool" });
        assert_eq!(find_ambiguous_parameter(&args), Some("style"));
    }

    #[test]
    fn ambiguous_parameter_ignores_long_style_value() {
        let args = serde_json::json!({ "style": "bold geometric minimalism" });
        assert_eq!(find_ambiguous_parameter(&args), None);
    }

    #[test]
    fn missing_or_empty_detects_blank_string() {
        let args = serde_json::json!({ "name": "   " });
        assert!(is_missing_or_empty(&args, "name"));
    }

    #[test]
    fn missing_or_empty_accepts_present_value() {
        let args = serde_json::json!({ "name": "spring sale" });
        assert!(!is_missing_or_empty(&args, "name"));
    }

    #[test]
    fn spending_amount_reads_either_budget_key() {
        assert_eq!(spending_amount(&serde_json::json!({ "budget": 75.0 })), Some(75.0));
        assert_eq!(spending_amount(&serde_json::json!({ "daily_budget": 10.0 })), Some(10.0));
        assert_eq!(spending_amount(&serde_json::json!({})), None);
    }

    #[test]
    fn preset_options_always_append_other_and_cancel() {
        let options = preset_options("style");
        assert_eq!(options[options.len() - 2].value, "__other__");
        assert_eq!(options[options.len() - 1].value, "__cancel__");
    }

    struct RequiresConfirmationStub;

    #[async_trait::async_trait]
    impl agenticlaw_tools::Tool for RequiresConfirmationStub {
        fn descriptor(&self) -> &agenticlaw_core::ToolDescriptor {
            use agenticlaw_core::ToolCategory;
            static DESC: std::sync::OnceLock<agenticlaw_core::ToolDescriptor> = std::sync::OnceLock::new();
            DESC.get_or_init(|| agenticlaw_core::ToolDescriptor {
                name: "publish_landing_page".into(),
                description: "test stub".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![],
                returns: "published page".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec![],
            })
        }
        async fn execute(&self, _args: Value) -> agenticlaw_tools::ToolResult {
            agenticlaw_tools::ToolResult::text("ok")
        }
    }

    #[tokio::test]
    async fn descriptor_requires_confirmation_gates_even_outside_hardcoded_sets() {
        let mut registry = ToolRegistry::new();
        registry.register(RequiresConfirmationStub).unwrap();

        let provider: Arc<dyn agenticlaw_llm::LlmProvider> = Arc::new(agenticlaw_llm::AnthropicProvider::new("test-key"));
        let evaluator = Evaluator::new(provider, "claude-default", 50.0);
        let plan = PlanStep {
            thought: "publishing".into(),
            action: Some("publish_landing_page".into()),
            action_input: Some(serde_json::json!({})),
            is_complete: false,
        };

        let evaluation = evaluator.evaluate(&plan, &registry).await;
        assert!(evaluation.needs_input);
        assert!(matches!(evaluation.kind, EvaluationKind::Confirm));
    }
}
