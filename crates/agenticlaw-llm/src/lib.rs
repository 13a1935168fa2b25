//! Agenticlaw LLM - Provider adapters with streaming support, plus the
//! structured-call helper the Planner (C6) and Evaluator (C7) use to get
//! strict JSON out of an inherently free-text model.

pub mod anthropic;
pub mod provider;
pub mod structured;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream};
pub use structured::structured_call;
pub use types::*;
