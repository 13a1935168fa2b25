//! Individual tool implementations, grouped by [`agenticlaw_core::ToolCategory`].
//!
//! To add a tool: implement it in the matching module, then register it in
//! [`crate::create_default_registry`].

pub mod ai_assisted;
pub mod builtin;
pub mod external_proxy;
