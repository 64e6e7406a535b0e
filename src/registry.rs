//! Session Registry (C6)
//!
//! A process-wide table of active sessions keyed by session id, with
//! idempotent creation, expiry-on-lookup, and an explicit cleanup sweep.
//! Grounded in `original_source/app/services/session_manager.py`'s
//! `SessionManager`. Cross-task mutation is confined to this map; each
//! session's [`crate::session::SessionState`] itself is owned exclusively by
//! its connection task once checked out (§5).

use crate::config::Config;
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {session_id}")]
    NotFound { session_id: String },
}

/// Process-wide session table. The registry never sees a session's content
/// after creation — the Controller task that created it is the sole owner
/// for the rest of its lifetime; the registry is consulted again only for
/// the process-level `cleanup_expired` sweep (§4.9).
pub struct Registry {
    sessions: Mutex<HashMap<String, SessionMeta>>,
    timeout: Duration,
}

struct SessionMeta {
    last_updated: chrono::DateTime<chrono::Utc>,
}

impl Registry {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: Duration::from_std(config.session_timeout).unwrap_or_else(|_| Duration::minutes(30)),
        }
    }

    /// Create a session, generating a UUID-shaped id if none is supplied.
    /// If a requested id already exists, registration is a no-op (idempotent).
    pub async fn register(&self, requested_id: Option<String>) -> String {
        let mut sessions = self.sessions.lock().await;
        let session_id = requested_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        sessions.entry(session_id.clone()).or_insert_with(|| SessionMeta { last_updated: chrono::Utc::now() });
        session_id
    }

    /// Record activity for a session, keeping its expiry clock fresh.
    pub async fn touch(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(meta) = sessions.get_mut(session_id) {
            meta.last_updated = chrono::Utc::now();
        }
    }

    /// Returns whether `session_id` is present and not expired; deletes it
    /// first if it has expired.
    pub async fn is_active(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.lock().await;
        let expired = sessions
            .get(session_id)
            .map(|meta| chrono::Utc::now() - meta.last_updated > self.timeout)
            .unwrap_or(false);
        if expired {
            sessions.remove(session_id);
            return false;
        }
        sessions.contains_key(session_id)
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Explicit sweep removing every expired entry.
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let now = chrono::Utc::now();
        let before = sessions.len();
        sessions.retain(|_, meta| now - meta.last_updated <= self.timeout);
        before - sessions.len()
    }
}

pub type SharedRegistry = Arc<Registry>;
