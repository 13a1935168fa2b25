//! Durable, TTL'd per-session memory behind a pluggable [`SessionStore`].
//!
//! Three kinds of state live per session: the conversation log (bounded
//! FIFO, 24h TTL), the pending execution state (at most one in-flight plan
//! step, 1h TTL — this is what survives a HITL suspend/resume), and a
//! ring buffer of the last 100 tool observations. [`MemoryStore`] backs
//! tests and single-process deployments; [`RedisStore`] backs anything
//! that needs the kernel to survive a process restart mid-conversation.

use agenticlaw_core::{KernelError, Message, Observation, SessionKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const CONVERSATION_LOG_LIMIT: usize = 50;
pub const CONVERSATION_LOG_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const EXECUTION_STATE_TTL: Duration = Duration::from_secs(60 * 60);
pub const OBSERVATION_RING_LIMIT: usize = 100;
pub const LOCK_TTL: Duration = Duration::from_secs(30);

/// The one in-flight plan step a session may have suspended on, e.g.
/// waiting for a HITL confirm/select/input response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionState {
    pub plan_step: serde_json::Value,
    pub operation_id: String,
    /// The parameter name the pending `user_input_request` was asking
    /// about, if any — `select`/`input` resumes write their answer here.
    #[serde(default)]
    pub target_parameter: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SessionSummary {
    pub message_count: usize,
    pub observation_count: usize,
    pub has_pending_state: bool,
    pub last_activity: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn append_message(&self, session: &SessionKey, message: Message) -> Result<(), KernelError>;
    async fn load_log(&self, session: &SessionKey) -> Result<Vec<Message>, KernelError>;

    async fn save_state(&self, session: &SessionKey, state: ExecutionState) -> Result<(), KernelError>;
    async fn load_state(&self, session: &SessionKey) -> Result<Option<ExecutionState>, KernelError>;
    async fn clear_state(&self, session: &SessionKey) -> Result<(), KernelError>;

    async fn record_observation(&self, session: &SessionKey, observation: Observation) -> Result<(), KernelError>;
    async fn load_observations(&self, session: &SessionKey) -> Result<Vec<Observation>, KernelError>;

    async fn clear_session(&self, session: &SessionKey) -> Result<(), KernelError>;
    async fn get_session_summary(&self, session: &SessionKey) -> Result<SessionSummary, KernelError>;

    /// Acquire the advisory per-session lock. Returns `true` if acquired or
    /// already held by `holder`, `false` if held by someone else.
    async fn try_lock(&self, session: &SessionKey, holder: &str) -> Result<bool, KernelError>;
    /// Extend the lock's TTL. Fails if `holder` does not currently hold it.
    async fn heartbeat_lock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError>;
    async fn unlock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError>;
}

// ---------------------------------------------------------------------
// MemoryStore — DashMap-backed, for tests and single-process deployments
// ---------------------------------------------------------------------

mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::collections::VecDeque;

    struct Entry<T> {
        value: T,
        expires_at: Instant,
    }

    impl<T> Entry<T> {
        fn new(value: T, ttl: Duration) -> Self {
            Self { value, expires_at: Instant::now() + ttl }
        }
        fn is_expired(&self) -> bool { Instant::now() >= self.expires_at }
    }

    #[derive(Default)]
    struct SessionData {
        log: VecDeque<Entry<Message>>,
        state: Option<Entry<ExecutionState>>,
        observations: VecDeque<Observation>,
        lock: Option<(String, Instant)>,
    }

    #[derive(Default)]
    pub struct MemoryStore {
        sessions: DashMap<SessionKey, SessionData>,
    }

    impl MemoryStore {
        pub fn new() -> Self { Self::default() }
    }

    #[async_trait]
    impl SessionStore for MemoryStore {
        async fn append_message(&self, session: &SessionKey, message: Message) -> Result<(), KernelError> {
            let mut entry = self.sessions.entry(session.clone()).or_default();
            entry.log.retain(|e| !e.is_expired());
            entry.log.push_back(Entry::new(message, CONVERSATION_LOG_TTL));
            while entry.log.len() > CONVERSATION_LOG_LIMIT {
                entry.log.pop_front();
            }
            Ok(())
        }

        async fn load_log(&self, session: &SessionKey) -> Result<Vec<Message>, KernelError> {
            Ok(self
                .sessions
                .get(session)
                .map(|entry| entry.log.iter().filter(|e| !e.is_expired()).map(|e| e.value.clone()).collect())
                .unwrap_or_default())
        }

        async fn save_state(&self, session: &SessionKey, state: ExecutionState) -> Result<(), KernelError> {
            self.sessions.entry(session.clone()).or_default().state = Some(Entry::new(state, EXECUTION_STATE_TTL));
            Ok(())
        }

        async fn load_state(&self, session: &SessionKey) -> Result<Option<ExecutionState>, KernelError> {
            Ok(self.sessions.get(session).and_then(|entry| {
                entry.state.as_ref().filter(|e| !e.is_expired()).map(|e| e.value.clone())
            }))
        }

        async fn clear_state(&self, session: &SessionKey) -> Result<(), KernelError> {
            if let Some(mut entry) = self.sessions.get_mut(session) {
                entry.state = None;
            }
            Ok(())
        }

        async fn record_observation(&self, session: &SessionKey, observation: Observation) -> Result<(), KernelError> {
            let mut entry = self.sessions.entry(session.clone()).or_default();
            entry.observations.push_back(observation);
            while entry.observations.len() > OBSERVATION_RING_LIMIT {
                entry.observations.pop_front();
            }
            Ok(())
        }

        async fn load_observations(&self, session: &SessionKey) -> Result<Vec<Observation>, KernelError> {
            Ok(self
                .sessions
                .get(session)
                .map(|entry| entry.observations.iter().cloned().collect())
                .unwrap_or_default())
        }

        async fn clear_session(&self, session: &SessionKey) -> Result<(), KernelError> {
            self.sessions.remove(session);
            Ok(())
        }

        async fn get_session_summary(&self, session: &SessionKey) -> Result<SessionSummary, KernelError> {
            Ok(self
                .sessions
                .get(session)
                .map(|entry| SessionSummary {
                    message_count: entry.log.iter().filter(|e| !e.is_expired()).count(),
                    observation_count: entry.observations.len(),
                    has_pending_state: entry.state.as_ref().is_some_and(|e| !e.is_expired()),
                    last_activity: entry.log.back().map(|e| e.value.timestamp),
                })
                .unwrap_or_default())
        }

        async fn try_lock(&self, session: &SessionKey, holder: &str) -> Result<bool, KernelError> {
            let mut entry = self.sessions.entry(session.clone()).or_default();
            let now = Instant::now();
            match &entry.lock {
                Some((current_holder, expires_at)) if *expires_at > now && current_holder != holder => Ok(false),
                _ => {
                    entry.lock = Some((holder.to_string(), now + LOCK_TTL));
                    Ok(true)
                }
            }
        }

        async fn heartbeat_lock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError> {
            let mut entry = self.sessions.entry(session.clone()).or_default();
            match &entry.lock {
                Some((current_holder, _)) if current_holder == holder => {
                    entry.lock = Some((holder.to_string(), Instant::now() + LOCK_TTL));
                    Ok(())
                }
                _ => Err(KernelError::SessionBusy(session.to_string())),
            }
        }

        async fn unlock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError> {
            if let Some(mut entry) = self.sessions.get_mut(session) {
                if matches!(&entry.lock, Some((current_holder, _)) if current_holder == holder) {
                    entry.lock = None;
                }
            }
            Ok(())
        }
    }
}

pub use memory::MemoryStore;

// ---------------------------------------------------------------------
// RedisStore — durable across process restarts
// ---------------------------------------------------------------------

mod redis_store {
    use super::*;
    use redis::AsyncCommands;

    pub struct RedisStore {
        conn: redis::aio::ConnectionManager,
    }

    impl RedisStore {
        pub async fn connect(url: &str) -> Result<Self, KernelError> {
            let client = redis::Client::open(url).map_err(map_err)?;
            let conn = client.get_connection_manager().await.map_err(map_err)?;
            Ok(Self { conn })
        }

        fn history_key(session: &SessionKey) -> String { format!("conversation:history:{session}") }
        fn state_key(session: &SessionKey) -> String { format!("agent:state:{session}") }
        fn observations_key(session: &SessionKey) -> String { format!("agent:tools:{session}") }
        fn lock_key(session: &SessionKey) -> String { format!("agent:lock:{session}") }
    }

    fn map_err(err: redis::RedisError) -> KernelError {
        KernelError::MemoryIo(err.to_string())
    }

    #[async_trait]
    impl SessionStore for RedisStore {
        async fn append_message(&self, session: &SessionKey, message: Message) -> Result<(), KernelError> {
            let key = Self::history_key(session);
            let payload = serde_json::to_string(&message).map_err(|e| KernelError::MemoryIo(e.to_string()))?;
            let mut conn = self.conn.clone();
            let _: () = conn.rpush(&key, payload).await.map_err(map_err)?;
            let _: () = conn.ltrim(&key, -(CONVERSATION_LOG_LIMIT as isize), -1).await.map_err(map_err)?;
            let _: () = conn.expire(&key, CONVERSATION_LOG_TTL.as_secs() as i64).await.map_err(map_err)?;
            Ok(())
        }

        async fn load_log(&self, session: &SessionKey) -> Result<Vec<Message>, KernelError> {
            let key = Self::history_key(session);
            let mut conn = self.conn.clone();
            let raw: Vec<String> = conn.lrange(&key, 0, -1).await.map_err(map_err)?;
            Ok(raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect())
        }

        async fn save_state(&self, session: &SessionKey, state: ExecutionState) -> Result<(), KernelError> {
            let key = Self::state_key(session);
            let payload = serde_json::to_string(&state).map_err(|e| KernelError::MemoryIo(e.to_string()))?;
            let mut conn = self.conn.clone();
            let _: () = conn.set_ex(&key, payload, EXECUTION_STATE_TTL.as_secs()).await.map_err(map_err)?;
            Ok(())
        }

        async fn load_state(&self, session: &SessionKey) -> Result<Option<ExecutionState>, KernelError> {
            let key = Self::state_key(session);
            let mut conn = self.conn.clone();
            let raw: Option<String> = conn.get(&key).await.map_err(map_err)?;
            Ok(raw.and_then(|s| serde_json::from_str(&s).ok()))
        }

        async fn clear_state(&self, session: &SessionKey) -> Result<(), KernelError> {
            let key = Self::state_key(session);
            let mut conn = self.conn.clone();
            let _: () = conn.del(&key).await.map_err(map_err)?;
            Ok(())
        }

        async fn record_observation(&self, session: &SessionKey, observation: Observation) -> Result<(), KernelError> {
            let key = Self::observations_key(session);
            let payload = serde_json::to_string(&observation).map_err(|e| KernelError::MemoryIo(e.to_string()))?;
            let mut conn = self.conn.clone();
            let _: () = conn.rpush(&key, payload).await.map_err(map_err)?;
            let _: () = conn.ltrim(&key, -(OBSERVATION_RING_LIMIT as isize), -1).await.map_err(map_err)?;
            let _: () = conn.expire(&key, CONVERSATION_LOG_TTL.as_secs() as i64).await.map_err(map_err)?;
            Ok(())
        }

        async fn load_observations(&self, session: &SessionKey) -> Result<Vec<Observation>, KernelError> {
            let key = Self::observations_key(session);
            let mut conn = self.conn.clone();
            let raw: Vec<String> = conn.lrange(&key, 0, -1).await.map_err(map_err)?;
            Ok(raw.iter().filter_map(|s| serde_json::from_str(s).ok()).collect())
        }

        async fn clear_session(&self, session: &SessionKey) -> Result<(), KernelError> {
            let mut conn = self.conn.clone();
            let keys = [
                Self::history_key(session),
                Self::state_key(session),
                Self::observations_key(session),
                Self::lock_key(session),
            ];
            let _: () = conn.del(&keys[..]).await.map_err(map_err)?;
            Ok(())
        }

        async fn get_session_summary(&self, session: &SessionKey) -> Result<SessionSummary, KernelError> {
            let mut conn = self.conn.clone();
            let message_count: usize = conn.llen(Self::history_key(session)).await.map_err(map_err)?;
            let observation_count: usize = conn.llen(Self::observations_key(session)).await.map_err(map_err)?;
            let has_pending_state: bool = conn.exists(Self::state_key(session)).await.map_err(map_err)?;
            let last_activity = self
                .load_log(session)
                .await?
                .last()
                .map(|m| m.timestamp);
            Ok(SessionSummary { message_count, observation_count, has_pending_state, last_activity })
        }

        async fn try_lock(&self, session: &SessionKey, holder: &str) -> Result<bool, KernelError> {
            let key = Self::lock_key(session);
            let mut conn = self.conn.clone();
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&key)
                .arg(holder)
                .arg("NX")
                .arg("EX")
                .arg(LOCK_TTL.as_secs())
                .query_async(&mut conn)
                .await
                .map_err(map_err)?;
            if acquired.is_some() {
                return Ok(true);
            }
            let current: Option<String> = conn.get(&key).await.map_err(map_err)?;
            Ok(current.as_deref() == Some(holder))
        }

        async fn heartbeat_lock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError> {
            let key = Self::lock_key(session);
            let mut conn = self.conn.clone();
            let current: Option<String> = conn.get(&key).await.map_err(map_err)?;
            if current.as_deref() != Some(holder) {
                return Err(KernelError::SessionBusy(session.to_string()));
            }
            let _: () = conn.expire(&key, LOCK_TTL.as_secs() as i64).await.map_err(map_err)?;
            Ok(())
        }

        async fn unlock(&self, session: &SessionKey, holder: &str) -> Result<(), KernelError> {
            let key = Self::lock_key(session);
            let mut conn = self.conn.clone();
            let current: Option<String> = conn.get(&key).await.map_err(map_err)?;
            if current.as_deref() == Some(holder) {
                let _: () = conn.del(&key).await.map_err(map_err)?;
            }
            Ok(())
        }
    }
}

pub use redis_store::RedisStore;

/// Build the configured `SessionStore`: `redis://...` selects [`RedisStore`],
/// anything else (including `memory://` or unset) selects [`MemoryStore`].
pub async fn build_session_store(session_store_url: &str) -> Result<std::sync::Arc<dyn SessionStore>, KernelError> {
    if session_store_url.starts_with("redis://") || session_store_url.starts_with("rediss://") {
        Ok(std::sync::Arc::new(RedisStore::connect(session_store_url).await?))
    } else {
        Ok(std::sync::Arc::new(MemoryStore::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_truncates_conversation_log_to_limit() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s1");
        for i in 0..(CONVERSATION_LOG_LIMIT + 10) {
            store.append_message(&session, Message::user(format!("msg {i}"))).await.unwrap();
        }
        let log = store.load_log(&session).await.unwrap();
        assert_eq!(log.len(), CONVERSATION_LOG_LIMIT);
        assert_eq!(log[0].content, "msg 10");
    }

    #[tokio::test]
    async fn memory_store_round_trips_execution_state() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s2");
        assert!(store.load_state(&session).await.unwrap().is_none());

        let state = ExecutionState {
            plan_step: serde_json::json!({"action": "pause_campaign"}),
            operation_id: "op-1".into(),
            target_parameter: None,
            updated_at: Utc::now(),
        };
        store.save_state(&session, state.clone()).await.unwrap();
        let loaded = store.load_state(&session).await.unwrap().unwrap();
        assert_eq!(loaded.operation_id, "op-1");

        store.clear_state(&session).await.unwrap();
        assert!(store.load_state(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_bounds_observation_ring_buffer() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s3");
        for i in 0..(OBSERVATION_RING_LIMIT + 5) {
            store
                .record_observation(&session, Observation::success("calculator", serde_json::json!(i), 1))
                .await
                .unwrap();
        }
        let observations = store.load_observations(&session).await.unwrap();
        assert_eq!(observations.len(), OBSERVATION_RING_LIMIT);
    }

    #[tokio::test]
    async fn memory_store_lock_is_exclusive_until_unlocked() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s4");
        assert!(store.try_lock(&session, "holder-a").await.unwrap());
        assert!(!store.try_lock(&session, "holder-b").await.unwrap());
        assert!(store.try_lock(&session, "holder-a").await.unwrap());

        store.unlock(&session, "holder-a").await.unwrap();
        assert!(store.try_lock(&session, "holder-b").await.unwrap());
    }

    #[tokio::test]
    async fn memory_store_heartbeat_fails_for_non_holder() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s5");
        store.try_lock(&session, "holder-a").await.unwrap();
        let err = store.heartbeat_lock(&session, "holder-b").await.unwrap_err();
        assert!(matches!(err, KernelError::SessionBusy(_)));
    }

    #[tokio::test]
    async fn clear_session_removes_log_state_and_observations() {
        let store = MemoryStore::new();
        let session = SessionKey::new("s6");
        store.append_message(&session, Message::user("hi")).await.unwrap();
        store
            .record_observation(&session, Observation::success("calculator", serde_json::json!(1), 1))
            .await
            .unwrap();
        store.clear_session(&session).await.unwrap();
        assert!(store.load_log(&session).await.unwrap().is_empty());
        assert!(store.load_observations(&session).await.unwrap().is_empty());
    }
}
