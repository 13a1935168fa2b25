//! Tools whose execution is itself an LLM call — ad copy generation,
//! targeting suggestions, competitor analysis, and the like. Each one asks
//! the model for a strict-JSON object via [`structured_call`] and returns
//! it verbatim as the tool's observation.

use crate::registry::{Tool, ToolResult};
use agenticlaw_core::{ParamSpec, ParamType, ToolCategory, ToolDescriptor};
use agenticlaw_llm::{structured_call, LlmProvider};
use serde_json::Value;
use std::sync::Arc;

fn param(name: &str, param_type: ParamType, required: bool, description: &str) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        param_type,
        required,
        default: None,
        r#enum: None,
        description: description.to_string(),
    }
}

/// One AI-assisted tool: a descriptor, a system prompt describing the
/// expected JSON shape, and a template for turning arguments into a user
/// prompt. The actual inference goes through `structured_call`, shared
/// with the planner and evaluator.
pub struct AiAssistedTool {
    descriptor: ToolDescriptor,
    provider: Arc<dyn LlmProvider>,
    model: String,
    system_prompt: &'static str,
    schema_hint: &'static str,
    prompt_template: fn(&Value) -> Result<String, String>,
}

impl AiAssistedTool {
    fn arg(args: &Value, name: &str) -> Result<String, String> {
        args.get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| format!("missing required parameter: {name}"))
    }

    pub fn generate_ad_copy(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "generate_ad_copy".into(),
                description: "Generate ad copy variants for a product or offer".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![
                    param("product", ParamType::String, true, "Product or offer description"),
                    param("tone", ParamType::String, false, "Desired tone, e.g. playful"),
                    param("variant_count", ParamType::Integer, false, "Number of variants to generate"),
                ],
                returns: "list of ad copy variants".into(),
                credit_cost: Some(0.5),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You write concise, high-performing ad copy for digital ad campaigns.",
            schema_hint: r#"{"variants": [{"headline": "string", "body": "string"}]}"#,
            prompt_template: |args| {
                let product = Self::arg(args, "product")?;
                let tone = args.get("tone").and_then(Value::as_str).unwrap_or("neutral");
                let count = args.get("variant_count").and_then(Value::as_u64).unwrap_or(3);
                Ok(format!("Write {count} ad copy variants in a {tone} tone for: {product}"))
            },
        }
    }

    pub fn optimize_copy(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "optimize_copy".into(),
                description: "Rewrite existing ad copy to improve clarity or conversion".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![
                    param("original_copy", ParamType::String, true, "Copy to optimize"),
                    param("goal", ParamType::String, false, "Optimization goal, e.g. clarity"),
                ],
                returns: "optimized copy".into(),
                credit_cost: Some(0.5),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You rewrite ad copy for clarity and conversion without changing its meaning.",
            schema_hint: r#"{"optimized_copy": "string", "rationale": "string"}"#,
            prompt_template: |args| {
                let original = Self::arg(args, "original_copy")?;
                let goal = args.get("goal").and_then(Value::as_str).unwrap_or("conversion");
                Ok(format!("Optimize this ad copy for {goal}:\n{original}"))
            },
        }
    }

    pub fn suggest_targeting(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "suggest_targeting".into(),
                description: "Suggest audience targeting parameters for a campaign".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![
                    param("product", ParamType::String, true, "Product or offer description"),
                    param("objective", ParamType::String, false, "Campaign objective"),
                ],
                returns: "targeting suggestion object".into(),
                credit_cost: Some(0.5),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You recommend ad audience targeting parameters given a product and objective.",
            schema_hint: r#"{"age_range": "string", "interests": ["string"], "locations": ["string"]}"#,
            prompt_template: |args| {
                let product = Self::arg(args, "product")?;
                let objective = args.get("objective").and_then(Value::as_str).unwrap_or("conversions");
                Ok(format!("Suggest targeting for a {objective} campaign selling: {product}"))
            },
        }
    }

    pub fn analyze_performance(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "analyze_performance".into(),
                description: "Analyze campaign performance data and surface insights".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![param("performance_data", ParamType::Object, true, "Raw performance metrics")],
                returns: "analysis object with insights and recommendations".into(),
                credit_cost: Some(0.5),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You analyze ad campaign performance metrics and surface actionable insights.",
            schema_hint: r#"{"insights": ["string"], "recommendations": ["string"]}"#,
            prompt_template: |args| {
                let data = args
                    .get("performance_data")
                    .ok_or_else(|| "missing required parameter: performance_data".to_string())?;
                Ok(format!("Analyze this campaign performance data:\n{data}"))
            },
        }
    }

    pub fn analyze_competitor(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "analyze_competitor".into(),
                description: "Analyze a competitor's advertising approach".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![param("competitor_description", ParamType::String, true, "What the competitor is doing")],
                returns: "competitive analysis object".into(),
                credit_cost: Some(0.5),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You analyze competitor advertising strategy and identify differentiation opportunities.",
            schema_hint: r#"{"strengths": ["string"], "weaknesses": ["string"], "opportunities": ["string"]}"#,
            prompt_template: |args| {
                let description = Self::arg(args, "competitor_description")?;
                Ok(format!("Analyze this competitor's ad approach:\n{description}"))
            },
        }
    }

    pub fn generate_landing_page_content(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "generate_landing_page_content".into(),
                description: "Generate landing page copy for a campaign".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![
                    param("product", ParamType::String, true, "Product or offer description"),
                    param("template", ParamType::String, false, "Layout template name"),
                ],
                returns: "landing page content object".into(),
                credit_cost: Some(0.75),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You write landing page copy for digital ad campaigns.",
            schema_hint: r#"{"headline": "string", "subheadline": "string", "body": "string", "cta": "string"}"#,
            prompt_template: |args| {
                let product = Self::arg(args, "product")?;
                let template = args.get("template").and_then(Value::as_str).unwrap_or("default");
                Ok(format!("Write landing page content using the {template} template for: {product}"))
            },
        }
    }

    pub fn translate_content(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "translate_content".into(),
                description: "Translate ad content into another language".into(),
                category: ToolCategory::AiAssisted,
                parameters: vec![
                    param("content", ParamType::String, true, "Content to translate"),
                    param("target_language", ParamType::String, true, "Target language"),
                ],
                returns: "translated content".into(),
                credit_cost: Some(0.25),
                requires_confirmation: false,
                tags: vec!["ai_assisted".into()],
            },
            provider,
            model: model.into(),
            system_prompt: "You translate ad content, preserving tone and persuasive intent.",
            schema_hint: r#"{"translated_content": "string"}"#,
            prompt_template: |args| {
                let content = Self::arg(args, "content")?;
                let target = Self::arg(args, "target_language")?;
                Ok(format!("Translate the following into {target}:\n{content}"))
            },
        }
    }
}

#[async_trait::async_trait]
impl Tool for AiAssistedTool {
    fn descriptor(&self) -> &ToolDescriptor { &self.descriptor }

    async fn execute(&self, args: Value) -> ToolResult {
        let prompt = match (self.prompt_template)(&args) {
            Ok(prompt) => prompt,
            Err(e) => return ToolResult::error(e),
        };

        let result: Result<Value, _> = structured_call(
            &self.provider,
            &self.model,
            self.system_prompt,
            self.schema_hint,
            &prompt,
        )
        .await;

        match result {
            Ok(value) => ToolResult::json(value),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }
}
