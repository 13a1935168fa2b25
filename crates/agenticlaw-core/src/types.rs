//! Core data model: sessions, messages, tool descriptors, and the kernel's
//! plan/evaluate/observe/event types shared across every crate.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Session identifier - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SessionKey(Arc<str>);

impl SessionKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SessionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Message role
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in the conversation log (session memory, §3).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "chrono::Utc::now")]
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: chrono::Utc::now(),
            metadata: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let mut msg = Self::new(Role::Tool, content);
        msg.tool_call_id = Some(tool_call_id.into());
        msg
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A tool call requested by the planner.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Tool definition as presented to the LLM (name/description/schema only —
/// no cost or confirmation metadata, which stays internal to the Registry).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

// ===========================================================================
// Principal
// ===========================================================================

/// Opaque caller identity plus optional per-capability model preferences.
/// Never stored by the kernel; carried per-request only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    #[serde(default)]
    pub preferences: ModelPreferences,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelPreferences {
    pub conversational_provider: Option<String>,
    pub conversational_model: Option<String>,
    pub image_generation_provider: Option<String>,
    pub image_generation_model: Option<String>,
    pub video_generation_provider: Option<String>,
    pub video_generation_model: Option<String>,
}

// ===========================================================================
// Tool Descriptor (C1)
// ===========================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Builtin,
    AiAssisted,
    ExternalProxy,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub r#enum: Option<Vec<String>>,
    pub description: String,
}

/// Immutable, globally-unique tool descriptor. See SPEC_FULL.md §4.1.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub parameters: Vec<ParamSpec>,
    pub returns: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_cost: Option<f64>,
    #[serde(default)]
    pub requires_confirmation: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ToolDescriptor {
    /// Names of parameters marked `required`, in declared order — the single
    /// source of truth the Evaluator's required-parameter check reads from,
    /// rather than a hand-duplicated table.
    pub fn required_parameters(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    pub fn to_llm_definition(&self) -> ToolDefinition {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .parameters
            .iter()
            .map(|p| {
                let mut schema = serde_json::json!({
                    "type": match p.param_type {
                        ParamType::String => "string",
                        ParamType::Number => "number",
                        ParamType::Integer => "integer",
                        ParamType::Boolean => "boolean",
                        ParamType::Object => "object",
                        ParamType::Array => "array",
                    },
                    "description": p.description,
                });
                if let Some(e) = &p.r#enum {
                    schema["enum"] = serde_json::json!(e);
                }
                (p.name.clone(), schema)
            })
            .collect();
        let required: Vec<&str> = self.required_parameters().collect();
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

// ===========================================================================
// PlanStep (C6), Evaluation (C7), Observation (C8)
// ===========================================================================

/// The planner's output for one kernel iteration. `is_complete=true` implies
/// `action=None`; `action=None ∧ is_complete=false` means "speak only".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlanStep {
    pub action: Option<String>,
    #[serde(default)]
    pub action_input: Option<serde_json::Value>,
    pub thought: String,
    pub is_complete: bool,
}

impl PlanStep {
    pub fn complete(thought: impl Into<String>) -> Self {
        Self {
            action: None,
            action_input: None,
            thought: thought.into(),
            is_complete: true,
        }
    }

    pub fn speak(thought: impl Into<String>) -> Self {
        Self {
            action: None,
            action_input: None,
            thought: thought.into(),
            is_complete: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    None,
    Confirm,
    Select,
    Input,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub primary: Option<bool>,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            description: None,
            primary: None,
        }
    }

    /// The sentinel appended to every `select` options list alongside `__cancel__`.
    pub fn other() -> Self {
        Self::new("__other__", "Something else")
    }

    pub fn cancel() -> Self {
        Self::new("__cancel__", "Cancel")
    }
}

/// The Evaluator's HITL decision for one PlanStep. `needs_input=false` implies
/// `kind=None`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Evaluation {
    pub needs_input: bool,
    pub kind: EvaluationKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub options: Option<Vec<SelectOption>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suggested_action: Option<PlanStep>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reason: Option<String>,
    /// Parameter name targeted by an `input`/`select` evaluation, used to
    /// merge the resume answer back into the suggested action.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_parameter: Option<String>,
}

impl Evaluation {
    pub fn none() -> Self {
        Self {
            needs_input: false,
            kind: EvaluationKind::None,
            question: None,
            options: None,
            suggested_action: None,
            reason: None,
            target_parameter: None,
        }
    }
}

/// The normalized result of running a tool once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Observation {
    pub tool: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<crate::error::ErrorPayload>,
    pub credit_charged: f64,
    pub attempts: u32,
}

impl Observation {
    pub fn success(tool: impl Into<String>, data: serde_json::Value, attempts: u32) -> Self {
        Self {
            tool: tool.into(),
            ok: true,
            data: Some(data),
            error: None,
            credit_charged: 0.0,
            attempts,
        }
    }

    pub fn failure(tool: impl Into<String>, error: crate::error::ErrorPayload, attempts: u32) -> Self {
        Self {
            tool: tool.into(),
            ok: false,
            data: None,
            error: Some(error),
            credit_charged: 0.0,
            attempts,
        }
    }
}

// ===========================================================================
// Event (externally streamed, §6)
// ===========================================================================

/// The kernel's typed output stream. The Gateway is the only thing that
/// knows how to turn this into SSE frames; the kernel never touches SSE.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "thinking")]
    Thinking { message: String },
    #[serde(rename = "thought")]
    Thought { content: String },
    #[serde(rename = "action")]
    Action { tool: String, message: String },
    #[serde(rename = "observation")]
    ObservationEvent {
        tool: String,
        success: bool,
        result: serde_json::Value,
        attempts: u32,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        attachments: Option<serde_json::Value>,
    },
    #[serde(rename = "evaluation")]
    EvaluationEvent {
        needs_input: bool,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        reason: Option<String>,
    },
    #[serde(rename = "reflection")]
    Reflection { content: String },
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "user_input_request")]
    UserInputRequest {
        kind: String,
        question: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        options: Option<Vec<SelectOption>>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        default_value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        metadata: Option<serde_json::Value>,
    },
    #[serde(rename = "error")]
    ErrorEvent(crate::error::ErrorPayload),
    #[serde(rename = "done")]
    Done {},
}

/// Gateway configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub bind: BindMode,
    #[serde(default)]
    pub auth: AuthConfig,
}

fn default_port() -> u16 {
    18789
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: BindMode::default(),
            auth: AuthConfig::default(),
        }
    }
}

/// Bind mode for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    Loopback,
    #[default]
    Lan,
}

impl BindMode {
    pub fn to_addr(&self) -> &str {
        match self {
            BindMode::Loopback => "127.0.0.1",
            BindMode::Lan => "0.0.0.0",
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    pub token: Option<String>,
}

/// Authentication mode
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Token,
    None,
}
