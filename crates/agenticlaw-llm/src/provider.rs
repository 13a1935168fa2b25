//! LLM Provider trait

use crate::types::{LlmRequest, StreamDelta};
use futures::Stream;
use std::pin::Pin;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("context overflow: {0}")]
    ContextOverflow(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl From<LlmError> for agenticlaw_core::KernelError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::AuthFailed(msg) => agenticlaw_core::KernelError::AuthFailed(msg),
            LlmError::RateLimited { retry_after_ms } => agenticlaw_core::KernelError::AiModelQuota {
                message: "rate limited by provider".into(),
                retry_after_secs: retry_after_ms / 1000,
            },
            LlmError::Cancelled => agenticlaw_core::KernelError::Cancelled,
            LlmError::NetworkError(_) | LlmError::StreamError(_) => {
                agenticlaw_core::KernelError::AiModelTimeout(err.to_string())
            }
            LlmError::RequestFailed(_) | LlmError::InvalidResponse(_) | LlmError::ContextOverflow(_) => {
                agenticlaw_core::KernelError::AiModelUnavailable(err.to_string())
            }
        }
    }
}

/// Stream type for LLM responses
pub type LlmStream = Pin<Box<dyn Stream<Item = LlmResult<StreamDelta>> + Send>>;

/// LLM Provider trait. Cancellation is not threaded through the provider
/// itself — callers race the whole `complete_stream` future (or the stream's
/// `.next()` polls) against a `CancellationToken` with `tokio::select!`, the
/// same way the kernel races every other external I/O boundary.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn models(&self) -> &[&str];

    fn supports_model(&self, model: &str) -> bool {
        self.models()
            .iter()
            .any(|m| *m == model || model.starts_with(m))
    }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream>;
}
