//! The gateway's HTTP surface: one streaming endpoint (§6) plus a health
//! check. Translates the kernel's typed [`agenticlaw_core::Event`] stream
//! into `data: <json>\n\n` SSE frames — the kernel itself never touches
//! HTTP.

use crate::auth::ResolvedAuth;
use agenticlaw_agent::kernel::ResumeInput;
use agenticlaw_agent::{AgentKernel, CreditClient, CreditGate, Evaluator, Executor, Planner};
use agenticlaw_core::{Config, GatewayConfig, RetryPolicy};
use agenticlaw_llm::AnthropicProvider;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::sse::{Event as SseEvent, Sse},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::stream::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything the gateway needs to build and drive an [`AgentKernel`] per
/// request. Built once at startup from [`Config`], never re-read.
pub struct Deps {
    pub auth: ResolvedAuth,
    pub gateway: GatewayConfig,
    pub kernel: Arc<AgentKernel>,
    pub default_model: String,
}

pub async fn start_gateway(config: Config) -> anyhow::Result<()> {
    let provider = Arc::new(AnthropicProvider::new(config.llm_api_key.clone()));
    let model = "claude-default".to_string();

    let backend_url = config.backend_api_url.clone().unwrap_or_default();
    let backend_token = config.backend_service_token.clone().unwrap_or_default();
    let registry = Arc::new(agenticlaw_tools::create_default_registry(
        provider.clone(),
        &model,
        &backend_url,
        &backend_token,
    ));
    info!(tools = registry.len(), "tool registry ready");

    let session_store_url = config.session_store_url.clone().unwrap_or_default();
    let store = agenticlaw_agent::build_session_store(&session_store_url).await?;

    let planner = Planner::new(provider.clone(), model.clone());
    let evaluator = Evaluator::new(provider.clone(), model.clone(), config.spending_threshold_usd);

    let ledger_url = config.credit_ledger_url.clone().unwrap_or_default();
    let ledger_token = config.credit_ledger_token.clone().unwrap_or_default();
    let credit_gate = CreditGate::new(CreditClient::new(ledger_url, ledger_token));
    let executor = Executor::new(credit_gate, RetryPolicy::default());

    let kernel = Arc::new(AgentKernel::new(store, registry, planner, evaluator, executor));

    let gateway = GatewayConfig {
        port: config.gateway_port,
        bind: match config.gateway_bind.as_str() {
            "loopback" | "localhost" | "127.0.0.1" => agenticlaw_core::BindMode::Loopback,
            _ => agenticlaw_core::BindMode::Lan,
        },
        auth: agenticlaw_core::AuthConfig {
            mode: if config.gateway_auth_token.is_some() {
                agenticlaw_core::AuthMode::Token
            } else {
                agenticlaw_core::AuthMode::None
            },
            token: config.gateway_auth_token.clone(),
        },
    };

    let auth = ResolvedAuth::from_config(&gateway.auth, config.gateway_auth_token.clone());

    let deps = Arc::new(Deps { auth, gateway: gateway.clone(), kernel, default_model: model });

    let app = Router::new()
        .route("/v1/agent/run", post(run_handler))
        .route("/health", get(health_handler))
        .layer(tower_http::cors::CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods(tower_http::cors::Any))
        .with_state(deps.clone());

    let bind_addr: SocketAddr = format!("{}:{}", gateway.bind.to_addr(), gateway.port)
        .parse()
        .expect("invalid bind address");

    info!("Agenticlaw Gateway v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  Run endpoint: POST http://{}/v1/agent/run", bind_addr);
    info!("  Auth mode: {:?}", gateway.auth.mode);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Deserialize)]
struct InboundMessage {
    #[allow(dead_code)]
    role: String,
    content: String,
    #[serde(default)]
    #[allow(dead_code)]
    attachments: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct ModelPreferences {
    #[serde(default)]
    #[allow(dead_code)]
    conversational_provider: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    conversational_model: Option<String>,
}

#[derive(Deserialize)]
struct ResumePayload {
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    selected_option: Option<String>,
    #[serde(default)]
    custom_value: Option<String>,
    #[serde(default)]
    cancelled: bool,
}

#[derive(Deserialize)]
struct RunRequest {
    messages: Vec<InboundMessage>,
    user_id: String,
    session_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    model_preferences: Option<ModelPreferences>,
    #[serde(default)]
    resume: Option<ResumePayload>,
}

async fn run_handler(
    State(deps): State<Arc<Deps>>,
    headers: HeaderMap,
    Json(request): Json<RunRequest>,
) -> impl IntoResponse {
    let provided_token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if deps.auth.verify_token(provided_token).is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    let Some(last) = request.messages.last() else {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "messages must not be empty" })),
        )
            .into_response();
    };
    let message = last.content.clone();

    let resume = request.resume.map(|r| ResumeInput {
        value: r.value,
        selected_option: r.selected_option,
        custom_value: r.custom_value,
        cancelled: r.cancelled,
    });

    let cancel = CancellationToken::new();
    let kernel = deps.kernel.clone();
    let events = kernel.run(message, request.user_id, request.session_id, resume, cancel);

    let sse_stream = events.map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok::<SseEvent, Infallible>(SseEvent::default().data(data))
    });

    Sse::new(sse_stream)
        .keep_alive(axum::response::sse::KeepAlive::default())
        .into_response()
}
