//! Agenticlaw Tools — the tool catalog the agent kernel can invoke.
//!
//! Each tool is a self-contained implementation in `src/tools/`, carrying
//! its own [`agenticlaw_core::ToolDescriptor`] (parameters, category,
//! credit cost, confirmation requirement). [`ToolRegistry`] is built once
//! at startup via [`create_default_registry`] and never mutated after —
//! registration rejects a duplicate name rather than silently overwriting.

pub mod proxy_client;
pub mod registry;
pub mod tools;

pub use proxy_client::ProxyClient;
pub use registry::{Tool, ToolRegistry, ToolResult};

use agenticlaw_llm::LlmProvider;
use std::sync::Arc;

/// Build the full tool catalog: builtin computation tools, AI-assisted
/// tools backed by `provider`/`model`, and external-proxy tools backed by
/// `backend_url`/`backend_token`.
pub fn create_default_registry(
    provider: Arc<dyn LlmProvider>,
    model: &str,
    backend_url: &str,
    backend_token: &str,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let proxy = ProxyClient::new(backend_url, backend_token);

    // --- Builtin (auto-approved, no backend call) ---
    registry.register(tools::builtin::GetCurrentDatetimeTool::new()).expect("unique tool names");
    registry.register(tools::builtin::CalculatorTool::new()).expect("unique tool names");
    registry.register(tools::builtin::WebSearchTool::new()).expect("unique tool names");

    // --- AI-assisted (LLM-backed) ---
    registry.register(tools::ai_assisted::AiAssistedTool::generate_ad_copy(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::optimize_copy(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::suggest_targeting(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::analyze_performance(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::analyze_competitor(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::generate_landing_page_content(provider.clone(), model)).expect("unique tool names");
    registry.register(tools::ai_assisted::AiAssistedTool::translate_content(provider, model)).expect("unique tool names");

    // --- External proxy (backend-mutating or backend-reporting) ---
    registry.register(tools::external_proxy::ExternalProxyTool::create_campaign(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::update_campaign(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::pause_campaign(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::delete_campaign(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::update_budget(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::disconnect_account(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::save_creative(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::list_creatives(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::publish_landing_page(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::upload_object(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::get_account_balance(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::get_campaign_reports(proxy.clone())).expect("unique tool names");
    registry.register(tools::external_proxy::ExternalProxyTool::get_performance_summary(proxy)).expect("unique tool names");

    registry
}
