//! The error taxonomy (C4, SPEC_FULL.md §4.4/§7): the *only* shape in which a
//! failure may leave the kernel. Every catch site converts into a `KernelError`
//! and from there into the wire-level `ErrorPayload` carried by `Event::ErrorEvent`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KernelError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("duplicate tool: {0}")]
    DuplicateTool(String),

    #[error("backend connection failed: {0}")]
    BackendConnection(String),

    #[error("backend timeout: {0}")]
    BackendTimeout(String),

    #[error("backend tool error ({code}): {message}")]
    BackendToolError { code: String, message: String, retryable: bool },

    #[error("ai model timeout: {0}")]
    AiModelTimeout(String),

    #[error("ai model quota exceeded: {0}")]
    AiModelQuota { message: String, retry_after_secs: u64 },

    #[error("ai model unavailable: {0}")]
    AiModelUnavailable(String),

    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: f64, available: f64 },

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("memory io error: {0}")]
    MemoryIo(String),

    #[error("session busy: {0}")]
    SessionBusy(String),

    #[error("cancelled")]
    Cancelled,

    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl KernelError {
    /// Stable three-digit code per SPEC_FULL.md §6.
    pub fn code(&self) -> String {
        match self {
            KernelError::Validation(_) => "1001",
            KernelError::AuthFailed(_) => "1002",
            KernelError::UnknownTool(_) | KernelError::DuplicateTool(_) => "1000",
            KernelError::Cancelled => "2000",
            KernelError::BackendConnection(_) => "3000",
            KernelError::BackendToolError { code, .. } => return code.clone(),
            KernelError::BackendTimeout(_) => "3004",
            KernelError::AiModelUnavailable(_) => "4001",
            KernelError::AiModelTimeout(_) => "4002",
            KernelError::AiModelQuota { .. } => "4003",
            KernelError::MemoryIo(_) => "5001",
            KernelError::SessionBusy(_) => "5003",
            KernelError::InsufficientCredits { .. } => "6011",
            KernelError::LedgerUnavailable(_) => "6012",
            KernelError::Config(_) => "1001",
            KernelError::Internal(_) => "5001",
        }
        .to_string()
    }

    /// Whether the Retry Policy (C3) should attempt this error again.
    pub fn is_retryable(&self) -> bool {
        match self {
            KernelError::BackendConnection(_)
            | KernelError::BackendTimeout(_)
            | KernelError::AiModelTimeout(_)
            | KernelError::AiModelUnavailable(_)
            | KernelError::LedgerUnavailable(_) => true,
            KernelError::AiModelQuota { .. } => true,
            KernelError::BackendToolError { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            KernelError::AiModelQuota { retry_after_secs, .. } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Build the wire-level payload, filling in the default message/action
    /// from the static table unless the variant already carries specifics.
    pub fn to_payload(&self) -> ErrorPayload {
        let code = self.code();
        let (action, action_url) = remediation(&code);
        ErrorPayload {
            code,
            message: self.to_string(),
            retryable: self.is_retryable(),
            retry_after: self.retry_after_secs(),
            action,
            action_url,
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            KernelError::InsufficientCredits { required, available } => Some(serde_json::json!({
                "required": required,
                "available": available,
            })),
            KernelError::BackendToolError { code, .. } => Some(serde_json::json!({ "backend_code": code })),
            _ => None,
        }
    }
}

/// The JSON shape of `error` SSE frames (§6) and of session-store error data
/// embedded in a failed `Observation`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
}

/// Static remediation hints keyed by code, mirroring the source `ERROR_MESSAGES`
/// table's `action`/`action_url` fields.
fn remediation(code: &str) -> (Option<String>, Option<String>) {
    match code {
        "6011" => (
            Some("Top up credits".to_string()),
            Some("/billing/top-up".to_string()),
        ),
        "6001" => (
            Some("Reconnect your ad account".to_string()),
            Some("/settings/accounts".to_string()),
        ),
        "4003" => (Some("Try again later or switch model".to_string()), None),
        "5003" => (Some("Retry shortly".to_string()), None),
        _ => (None, None),
    }
}

/// Gateway/transport-level error, distinct from `KernelError` — covers
/// failures that happen before a kernel invocation even starts (auth, bad
/// request bodies, unknown sessions at the HTTP layer).
#[derive(Error, Debug)]
pub enum Error {
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_credits_maps_to_6011_nonretryable() {
        let e = KernelError::InsufficientCredits { required: 10.0, available: 2.0 };
        let payload = e.to_payload();
        assert_eq!(payload.code, "6011");
        assert!(!payload.retryable);
        assert_eq!(payload.details.unwrap()["required"], 10.0);
    }

    #[test]
    fn backend_timeout_is_retryable() {
        let e = KernelError::BackendTimeout("slow".into());
        assert!(e.is_retryable());
        assert_eq!(e.code(), "3004");
    }

    #[test]
    fn session_busy_is_not_retryable() {
        let e = KernelError::SessionBusy("locked".into());
        assert!(!e.is_retryable());
        assert_eq!(e.code(), "5003");
    }

    #[test]
    fn cancelled_is_not_retryable_and_code_is_generic() {
        let e = KernelError::Cancelled;
        assert!(!e.is_retryable());
    }
}
