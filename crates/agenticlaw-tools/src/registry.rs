//! Tool registry and trait definitions.
//!
//! Each tool is a self-contained module implementing the [`Tool`] trait and
//! carries its own [`ToolDescriptor`] (name, category, parameter schema,
//! credit cost, confirmation requirement). The registry is built once at
//! startup and is immutable afterward — registration rejects duplicate
//! names rather than silently overwriting, since a silent collision here
//! would let one tool's confirmation/cost posture shadow another's.

use agenticlaw_core::{KernelError, ToolDefinition, ToolDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub enum ToolResult {
    Text(String),
    Json(Value),
    Error(String),
}

impl ToolResult {
    pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }
    pub fn json(v: Value) -> Self { Self::Json(v) }
    pub fn error(s: impl Into<String>) -> Self { Self::Error(s.into()) }

    pub fn is_error(&self) -> bool { matches!(self, Self::Error(_)) }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::Json(v) => v.clone(),
            Self::Error(e) => serde_json::json!({ "error": e }),
        }
    }
}

/// Implement this to add a new tool. Each tool is a standalone unit
/// registered with a [`ToolRegistry`] at startup.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Static descriptor: name, category, parameter schema, cost, confirmation.
    fn descriptor(&self) -> &ToolDescriptor;

    fn name(&self) -> &str { &self.descriptor().name }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> ToolResult;

    /// Execute with cancellation support. Default: race `execute()` against
    /// cancellation; tools with their own long-lived I/O (HTTP calls) may
    /// override this to cancel the underlying request instead of just the
    /// wrapping future.
    async fn execute_cancellable(&self, args: Value, cancel: CancellationToken) -> ToolResult {
        tokio::select! {
            result = self.execute(args) => result,
            _ = cancel.cancelled() => ToolResult::error("cancelled"),
        }
    }

    fn to_llm_definition(&self) -> ToolDefinition {
        self.descriptor().to_llm_definition()
    }
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, kept alongside the lookup map so
    /// `descriptors()`/`get_definitions()`/`list()` are stable across runs
    /// (§4.1 requires `describe_all()` in registration order) rather than
    /// whatever order a `HashMap` happens to iterate in.
    order: Vec<String>,
}

impl Default for ToolRegistry {
    fn default() -> Self { Self::new() }
}

impl ToolRegistry {
    pub fn new() -> Self { Self { tools: HashMap::new(), order: Vec::new() } }

    /// Register a tool. Rejects a name already present rather than
    /// overwriting it.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), KernelError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(KernelError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn descriptor(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name).map(|t| t.descriptor())
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolResult, KernelError> {
        match self.tools.get(name) {
            Some(tool) => Ok(tool.execute(args).await),
            None => Err(KernelError::UnknownTool(name.to_string())),
        }
    }

    pub async fn execute_cancellable(
        &self,
        name: &str,
        args: Value,
        cancel: CancellationToken,
    ) -> Result<ToolResult, KernelError> {
        match self.tools.get(name) {
            Some(tool) => Ok(tool.execute_cancellable(args, cancel).await),
            None => Err(KernelError::UnknownTool(name.to_string())),
        }
    }

    pub fn get_definitions(&self) -> Vec<ToolDefinition> {
        self.order.iter().filter_map(|name| self.tools.get(name)).map(|t| t.to_llm_definition()).collect()
    }

    pub fn descriptors(&self) -> Vec<&ToolDescriptor> {
        self.order.iter().filter_map(|name| self.tools.get(name)).map(|t| t.descriptor()).collect()
    }

    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize { self.tools.len() }
    pub fn is_empty(&self) -> bool { self.tools.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenticlaw_core::ToolCategory;

    struct Stub(ToolDescriptor);

    #[async_trait::async_trait]
    impl Tool for Stub {
        fn descriptor(&self) -> &ToolDescriptor { &self.0 }
        async fn execute(&self, _args: Value) -> ToolResult { ToolResult::text("ok") }
    }

    fn descriptor(name: &str) -> ToolDescriptor {
        ToolDescriptor {
            name: name.to_string(),
            description: "stub".into(),
            category: ToolCategory::Builtin,
            parameters: vec![],
            returns: "text".into(),
            credit_cost: None,
            requires_confirmation: false,
            tags: vec![],
        }
    }

    #[test]
    fn registering_duplicate_name_is_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(Stub(descriptor("calculator"))).unwrap();
        let err = registry.register(Stub(descriptor("calculator"))).unwrap_err();
        assert!(matches!(err, KernelError::DuplicateTool(name) if name == "calculator"));
    }

    #[tokio::test]
    async fn executing_unknown_tool_returns_unknown_tool_error() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nope", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, KernelError::UnknownTool(name) if name == "nope"));
    }

    #[test]
    fn descriptors_and_list_preserve_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Stub(descriptor("zeta"))).unwrap();
        registry.register(Stub(descriptor("alpha"))).unwrap();
        registry.register(Stub(descriptor("mid"))).unwrap();

        assert_eq!(registry.list(), vec!["zeta", "alpha", "mid"]);
        let names: Vec<&str> = registry.descriptors().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
