//! Integration tests for the tool registry and catalog shape.

use agenticlaw_core::ToolCategory;
use agenticlaw_tools::tools::builtin::{CalculatorTool, GetCurrentDatetimeTool, WebSearchTool};
use agenticlaw_tools::tools::external_proxy::ExternalProxyTool;
use agenticlaw_tools::{ProxyClient, Tool, ToolRegistry};

fn test_proxy() -> ProxyClient {
    ProxyClient::new("http://localhost:0", "test-token")
}

#[test]
fn registry_rejects_duplicate_registration() {
    let mut registry = ToolRegistry::new();
    registry.register(CalculatorTool::new()).unwrap();
    let err = registry.register(CalculatorTool::new());
    assert!(err.is_err());
}

#[test]
fn builtin_tools_are_unconfirmed_and_categorized_correctly() {
    let mut registry = ToolRegistry::new();
    registry.register(GetCurrentDatetimeTool::new()).unwrap();
    registry.register(CalculatorTool::new()).unwrap();
    registry.register(WebSearchTool::new()).unwrap();

    for name in ["get_current_datetime", "calculator", "web_search"] {
        let descriptor = registry.descriptor(name).unwrap();
        assert_eq!(descriptor.category, ToolCategory::Builtin);
        assert!(!descriptor.requires_confirmation);
    }
}

#[test]
fn high_risk_mutation_tools_require_confirmation() {
    let proxy = test_proxy();
    let mut registry = ToolRegistry::new();
    registry.register(ExternalProxyTool::create_campaign(proxy.clone())).unwrap();
    registry.register(ExternalProxyTool::delete_campaign(proxy.clone())).unwrap();
    registry.register(ExternalProxyTool::update_budget(proxy)).unwrap();

    for name in ["create_campaign", "delete_campaign", "update_budget"] {
        assert!(registry.descriptor(name).unwrap().requires_confirmation);
    }
}

#[test]
fn read_only_reporting_tools_do_not_require_confirmation() {
    let proxy = test_proxy();
    let mut registry = ToolRegistry::new();
    registry.register(ExternalProxyTool::get_account_balance(proxy.clone())).unwrap();
    registry.register(ExternalProxyTool::get_campaign_reports(proxy.clone())).unwrap();
    registry.register(ExternalProxyTool::get_performance_summary(proxy)).unwrap();

    for name in ["get_account_balance", "get_campaign_reports", "get_performance_summary"] {
        assert!(!registry.descriptor(name).unwrap().requires_confirmation);
    }
}

#[tokio::test]
async fn get_unknown_tool_by_name_returns_none() {
    let registry = ToolRegistry::new();
    assert!(registry.get("nonexistent").is_none());
}

#[test]
fn tool_descriptors_carry_required_parameters_for_the_evaluator() {
    let proxy = test_proxy();
    let mut registry = ToolRegistry::new();
    registry.register(ExternalProxyTool::create_campaign(proxy)).unwrap();

    let descriptor = registry.descriptor("create_campaign").unwrap();
    let required: Vec<&str> = descriptor.required_parameters().collect();
    assert_eq!(required, vec!["name", "daily_budget"]);
}

#[tokio::test]
async fn executing_create_campaign_without_backend_reports_connection_error() {
    let proxy = test_proxy();
    let mut registry = ToolRegistry::new();
    registry.register(ExternalProxyTool::create_campaign(proxy)).unwrap();

    let result = registry
        .execute("create_campaign", serde_json::json!({"name": "spring sale", "daily_budget": 50}))
        .await
        .unwrap();
    assert!(result.is_error());
}
