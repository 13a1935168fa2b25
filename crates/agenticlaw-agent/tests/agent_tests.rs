//! Integration tests for agenticlaw-agent: ContextManager token bookkeeping
//! and the session store's cross-cutting behaviors exercised end to end.

use agenticlaw_agent::{ContextManager, MemoryStore, SessionStore};
use agenticlaw_core::{Message, SessionKey};
use agenticlaw_llm::{ContentBlock, LlmContent, LlmMessage};

#[test]
fn context_manager_estimate_tokens() {
    assert_eq!(ContextManager::estimate_tokens(""), 0);
    assert_eq!(ContextManager::estimate_tokens("hi"), 1);
    assert_eq!(ContextManager::estimate_tokens("hello"), 2);
    assert_eq!(ContextManager::estimate_tokens("hello world"), 3);
}

#[test]
fn context_manager_message_tokens_blocks() {
    let msg = LlmMessage {
        role: "assistant".into(),
        content: LlmContent::Blocks(vec![
            ContentBlock::Text { text: "hi".into() },
            ContentBlock::ToolUse {
                id: "tc-1".into(),
                name: "read".into(),
                input: serde_json::json!({"path": "/tmp/foo"}),
            },
        ]),
    };
    let tokens = ContextManager::message_tokens(&msg);
    assert!(tokens > 10, "expected > 10 tokens, got {tokens}");
}

#[test]
fn context_manager_compact_removes_old_messages() {
    let cm = ContextManager::new(100);
    let mut messages: Vec<LlmMessage> = (0..50)
        .map(|i| LlmMessage {
            role: "user".into(),
            content: LlmContent::Text(format!(
                "This is message number {i} with some padding text to use tokens"
            )),
        })
        .collect();

    let before = messages.len();
    cm.compact(&mut messages);
    assert!(messages.len() < before);
    assert!(messages.len() >= 2);
}

#[test]
fn context_manager_no_compact_under_limit() {
    let cm = ContextManager::new(1_000_000);
    let mut messages = vec![LlmMessage { role: "user".into(), content: LlmContent::Text("hello".into()) }];
    let before = messages.len();
    cm.compact(&mut messages);
    assert_eq!(messages.len(), before);
}

#[tokio::test]
async fn session_store_round_trips_a_conversation() {
    let store = MemoryStore::new();
    let session = SessionKey::new("integration-1");

    store.append_message(&session, Message::user("hi there")).await.unwrap();
    store.append_message(&session, Message::assistant("hello!")).await.unwrap();

    let log = store.load_log(&session).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].content, "hi there");
    assert_eq!(log[1].content, "hello!");
}

#[tokio::test]
async fn session_store_summary_reflects_pending_state() {
    let store = MemoryStore::new();
    let session = SessionKey::new("integration-2");

    let summary = store.get_session_summary(&session).await.unwrap();
    assert!(!summary.has_pending_state);

    store
        .save_state(
            &session,
            agenticlaw_agent::ExecutionState {
                plan_step: serde_json::json!({ "thought": "t", "is_complete": false }),
                operation_id: "op-1".into(),
                target_parameter: None,
                updated_at: chrono::Utc::now(),
            },
        )
        .await
        .unwrap();

    let summary = store.get_session_summary(&session).await.unwrap();
    assert!(summary.has_pending_state);
}

#[tokio::test]
async fn clear_session_wipes_log_state_and_observations() {
    let store = MemoryStore::new();
    let session = SessionKey::new("integration-3");

    store.append_message(&session, Message::user("hi")).await.unwrap();
    store.clear_session(&session).await.unwrap();

    let log = store.load_log(&session).await.unwrap();
    assert!(log.is_empty());
}
