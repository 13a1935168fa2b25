//! Pooled HTTP client for tools that proxy to the ads backend
//! (`BACKEND_API_URL`, bearer-authenticated with `BACKEND_SERVICE_TOKEN`).
//!
//! Mirrors the pooling posture of the credit ledger client: one
//! `reqwest::Client` shared across every external-proxy tool instance rather
//! than one per call.

use agenticlaw_core::KernelError;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl ProxyClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(20)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client build should not fail with a static config");
        Self { client, base_url: base_url.into(), token: token.into() }
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, KernelError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(map_transport_error)?;
        handle_response(response).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, KernelError> {
        self.send(reqwest::Method::POST, path, Some(body)).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value, KernelError> {
        self.send(reqwest::Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, KernelError> {
        self.send(reqwest::Method::DELETE, path, None).await
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, KernelError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(map_transport_error)?;
        handle_response(response).await
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value, KernelError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<Value>()
            .await
            .map_err(|e| KernelError::BackendToolError {
                code: "invalid_response".into(),
                message: e.to_string(),
                retryable: false,
            });
    }
    let retryable = status.is_server_error() || status.as_u16() == 429;
    let body = response.text().await.unwrap_or_default();
    Err(KernelError::BackendToolError {
        code: status.as_u16().to_string(),
        message: body,
        retryable,
    })
}

fn map_transport_error(err: reqwest::Error) -> KernelError {
    if err.is_timeout() {
        KernelError::BackendTimeout(err.to_string())
    } else {
        KernelError::BackendConnection(err.to_string())
    }
}
