//! Bridge session storage.
//!
//! A bridge session is the local record minted after Sparka confirms a
//! browser's session cookie. It caches the identity snapshot Sparka returned
//! so `/api/auth/me` can answer without another round trip. Sparka remains
//! the source of truth; nothing here is ever written back.
//!
//! `MemorySessionStore` is the only backend: sessions are lost on restart
//! and the browser simply re-runs the SSO redirect. The trait keeps the
//! seam open for a shared backend in multi-node deployments.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::sparka::{SparkaCredits, SparkaEntitlement, SparkaUser};

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session store error: {0}")]
    #[allow(dead_code)] // The memory store is infallible; fallible backends construct this
    Backend(String),
}

/// A signed-in user's session, minted from a Sparka validation verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSession {
    /// Session ID (the cookie value)
    pub id: Uuid,

    /// The user Sparka reported for the validated cookie
    pub user: SparkaUser,

    /// Entitlement snapshot at sign-in time, verbatim from Sparka
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlement: Option<SparkaEntitlement>,

    /// Credit balances at sign-in time, verbatim from Sparka
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<SparkaCredits>,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session expires
    pub expires_at: DateTime<Utc>,
}

impl BridgeSession {
    pub fn new(
        user: SparkaUser,
        entitlement: Option<SparkaEntitlement>,
        credits: Option<SparkaCredits>,
        duration_secs: u64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user,
            entitlement,
            credits,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(duration_secs as i64),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Trait for bridge session storage.
///
/// Implementations must be thread-safe and handle concurrent access.
/// `get_session` only ever returns live sessions; expired entries are
/// treated as absent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a new session.
    async fn create_session(&self, session: BridgeSession) -> SessionResult<Uuid>;

    /// Get a live session by ID.
    async fn get_session(&self, id: Uuid) -> SessionResult<Option<BridgeSession>>;

    /// Delete a session. Deleting an unknown ID is not an error.
    async fn delete_session(&self, id: Uuid) -> SessionResult<()>;

    /// Drop expired sessions, returning how many were removed.
    async fn cleanup(&self) -> SessionResult<usize>;
}

/// Type alias for a shared session store.
pub type SharedSessionStore = Arc<dyn SessionStore>;

// ─────────────────────────────────────────────────────────────────────────────
// Memory Session Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory session store.
///
/// Suitable for single-node deployments. Sessions are lost on restart and
/// not shared across nodes.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, BridgeSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: BridgeSession) -> SessionResult<Uuid> {
        let id = session.id;
        let mut sessions = self.sessions.write().await;
        sessions.insert(id, session);
        Ok(id)
    }

    async fn get_session(&self, id: Uuid) -> SessionResult<Option<BridgeSession>> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(&id).cloned()
        };

        // Expired entries are evicted on read
        if let Some(ref s) = session
            && s.is_expired()
        {
            let mut sessions = self.sessions.write().await;
            sessions.remove(&id);
            return Ok(None);
        }

        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> SessionResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&id);
        Ok(())
    }

    async fn cleanup(&self) -> SessionResult<usize> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok(before - sessions.len())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Sweeper
// ─────────────────────────────────────────────────────────────────────────────

/// Starts the expired-session sweeper as a background task.
///
/// Runs until the task is cancelled. Expired sessions are also evicted
/// lazily on read, so the sweeper only bounds memory held by sessions
/// nobody touches again.
pub async fn start_session_sweeper(store: SharedSessionStore, interval: Duration) {
    if interval.is_zero() {
        tracing::info!("Session sweeper disabled by configuration");
        return;
    }

    tracing::info!(interval_secs = interval.as_secs(), "Starting session sweeper");

    loop {
        match store.cleanup().await {
            Ok(removed) if removed > 0 => {
                tracing::debug!(removed, "Swept expired sessions");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(error = %e, "Session sweep failed");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(id: &str) -> SparkaUser {
        SparkaUser {
            id: id.to_string(),
            email: Some(format!("{}@example.com", id)),
            name: Some("Test User".to_string()),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        let session = BridgeSession::new(test_user("u1"), None, None, 3600);
        let id = session.id;

        store.create_session(session).await.unwrap();

        let retrieved = store.get_session(id).await.unwrap().unwrap();
        assert_eq!(retrieved.user.id, "u1");

        store.delete_session(id).await.unwrap();
        assert!(store.get_session(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_not_returned() {
        let store = MemorySessionStore::new();
        let mut session = BridgeSession::new(test_user("u1"), None, None, 3600);
        session.expires_at = Utc::now() - chrono::Duration::hours(1);
        let id = session.id;

        store.create_session(session).await.unwrap();
        assert!(store.get_session(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired() {
        let store = MemorySessionStore::new();

        let live = BridgeSession::new(test_user("live"), None, None, 3600);
        let live_id = live.id;
        let mut stale = BridgeSession::new(test_user("stale"), None, None, 3600);
        stale.expires_at = Utc::now() - chrono::Duration::minutes(5);
        let stale_id = stale.id;

        store.create_session(live).await.unwrap();
        store.create_session(stale).await.unwrap();
        let removed = store.cleanup().await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.get_session(live_id).await.unwrap().is_some());
        assert!(store.get_session(stale_id).await.unwrap().is_none());
    }

    #[test]
    fn test_session_expiry() {
        let session = BridgeSession::new(test_user("u1"), None, None, 3600);
        assert!(!session.is_expired());
        assert!(session.expires_at > session.created_at);

        let mut expired = BridgeSession::new(test_user("u1"), None, None, 3600);
        expired.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(expired.is_expired());
    }

    #[tokio::test]
    async fn test_sweeper_drops_expired_sessions() {
        let store = Arc::new(MemorySessionStore::new());

        let mut stale = BridgeSession::new(test_user("stale"), None, None, 3600);
        stale.expires_at = Utc::now() - chrono::Duration::minutes(5);
        store.create_session(stale).await.unwrap();
        let live = BridgeSession::new(test_user("live"), None, None, 3600);
        store.create_session(live).await.unwrap();

        tokio::spawn(start_session_sweeper(
            store.clone(),
            Duration::from_millis(20),
        ));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_zero_interval_returns_immediately() {
        let store: SharedSessionStore = Arc::new(MemorySessionStore::new());
        start_session_sweeper(store, Duration::ZERO).await;
    }
}
