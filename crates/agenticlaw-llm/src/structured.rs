//! Structured JSON extraction on top of a streaming [`LlmProvider`].
//!
//! The planner and evaluator both need a single typed value back from a
//! model that only speaks free-text token streams. `structured_call`
//! accumulates a completion, parses it as JSON, and — since models
//! occasionally wrap the object in prose or a code fence — allows exactly
//! one repair round-trip where the malformed output is sent back with a
//! corrective system note before giving up.

use crate::provider::{LlmError, LlmProvider, LlmResult};
use crate::types::{LlmContent, LlmMessage, LlmRequest};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const REPAIR_SYSTEM_NOTE: &str = "Your previous response could not be parsed as JSON. \
Respond again with ONLY the corrected JSON object — no prose, no markdown code fence.";

/// Run `prompt` against `provider`, returning the accumulated text parsed as
/// `T`. `schema_hint` is folded into the system prompt to steer the model
/// toward the expected shape; it is advisory only, not validated.
pub async fn structured_call<T: DeserializeOwned>(
    provider: &Arc<dyn LlmProvider>,
    model: &str,
    system: &str,
    schema_hint: &str,
    prompt: &str,
) -> LlmResult<T> {
    let full_system = format!("{system}\n\nRespond with ONLY a JSON object matching this shape:\n{schema_hint}");

    let first_attempt = run_completion(provider, model, &full_system, prompt).await?;
    match parse_json::<T>(&first_attempt) {
        Ok(value) => return Ok(value),
        Err(_) => {
            tracing::debug!("structured_call: first response failed to parse, attempting repair");
        }
    }

    let repair_prompt = format!(
        "Your previous response was:\n{first_attempt}\n\n{REPAIR_SYSTEM_NOTE}"
    );
    let repaired = run_completion(provider, model, &full_system, &repair_prompt).await?;
    parse_json::<T>(&repaired).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    let trimmed = strip_code_fence(text.trim());
    serde_json::from_str(trimmed)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

async fn run_completion(
    provider: &Arc<dyn LlmProvider>,
    model: &str,
    system: &str,
    prompt: &str,
) -> LlmResult<String> {
    let request = LlmRequest {
        model: model.to_string(),
        messages: vec![LlmMessage {
            role: "user".to_string(),
            content: LlmContent::Text(prompt.to_string()),
        }],
        tools: None,
        max_tokens: Some(4096),
        temperature: Some(0.0),
        system: Some(system.to_string()),
    };

    let mut stream = provider.complete_stream(request).await?;
    let mut text = String::new();
    while let Some(delta) = stream.next().await {
        match delta? {
            crate::types::StreamDelta::Text(chunk) => text.push_str(&chunk),
            crate::types::StreamDelta::Error(msg) => return Err(LlmError::StreamError(msg)),
            crate::types::StreamDelta::Done { .. } => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, PartialEq, Debug)]
    struct Example {
        action: String,
        confidence: f64,
    }

    #[test]
    fn parses_plain_json() {
        let raw = r#"{"action": "pause_campaign", "confidence": 0.9}"#;
        let parsed: Example = parse_json(raw).unwrap();
        assert_eq!(parsed, Example { action: "pause_campaign".into(), confidence: 0.9 });
    }

    #[test]
    fn strips_code_fence_before_parsing() {
        let raw = "```json\n{\"action\": \"pause_campaign\", \"confidence\": 0.9}\n```";
        let parsed: Example = parse_json(raw).unwrap();
        assert_eq!(parsed.action, "pause_campaign");
    }

    #[test]
    fn rejects_prose_wrapped_json() {
        let raw = "Sure, here you go: {\"action\": \"x\", \"confidence\": 1.0}";
        let result: Result<Example, _> = parse_json(raw);
        assert!(result.is_err());
    }
}
