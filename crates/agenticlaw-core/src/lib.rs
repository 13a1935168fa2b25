//! Agenticlaw Core - shared types, error taxonomy, configuration, and retry policy.

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::Config;
pub use error::{Error, ErrorPayload, KernelError, Result};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::*;
