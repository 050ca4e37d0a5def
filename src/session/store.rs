//! Session store: one conversation per user identity.
//!
//! The map itself sits behind an `RwLock` that is only held long enough to
//! look up or insert an entry. Each entry has its own async mutex, so work
//! for one user serializes while different users never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::model::Session;
use crate::providers::PendingSearches;

/// A session together with the searches it has in flight.
pub struct SessionEntry {
    pub session: Session,
    pub searches: PendingSearches,
}

impl SessionEntry {
    fn new(user_id: &str) -> Self {
        Self {
            session: Session::new(user_id),
            searches: PendingSearches::new(),
        }
    }

    /// Cancel in-flight searches and wipe the session back to the first step.
    pub fn reset(&mut self) {
        self.searches.abort_all();
        self.session.reset();
    }
}

/// Shared, lockable handle to one user's session.
pub type SessionHandle = Arc<Mutex<SessionEntry>>;

/// In-memory keyed store of sessions.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
        })
    }

    /// Existing session for a user, if any.
    pub async fn get(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(user_id).cloned()
    }

    /// Existing session, or a fresh one in the first step.
    pub async fn get_or_create(&self, user_id: &str) -> SessionHandle {
        self.resolve(user_id).await.0
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// the session was created by this call.
    pub async fn resolve(&self, user_id: &str) -> (SessionHandle, bool) {
        if let Some(handle) = self.get(user_id).await {
            return (handle, false);
        }

        let mut sessions = self.sessions.write().await;
        // Another caller may have inserted while we waited for the write lock.
        if let Some(handle) = sessions.get(user_id) {
            return (Arc::clone(handle), false);
        }
        info!(user_id = %user_id, "Session created");
        let handle = Arc::new(Mutex::new(SessionEntry::new(user_id)));
        sessions.insert(user_id.to_string(), Arc::clone(&handle));
        (handle, true)
    }

    /// Discard a user's answers and searches, keeping the same identity key.
    pub async fn reset(&self, user_id: &str) -> SessionHandle {
        let handle = self.get_or_create(user_id).await;
        handle.lock().await.reset();
        debug!(user_id = %user_id, "Session reset");
        handle
    }

    /// Remove a session entirely. Returns whether one existed.
    pub async fn delete(&self, user_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(user_id);
        if removed.is_some() {
            info!(user_id = %user_id, "Session deleted");
        }
        // In-flight searches are aborted when the last handle drops.
        removed.is_some()
    }

    /// Clone of a user's session for read-only inspection.
    pub async fn snapshot(&self, user_id: &str) -> Option<Session> {
        let handle = self.get(user_id).await?;
        let entry = handle.lock().await;
        Some(entry.session.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions idle for at least `max_idle`. Sessions that are locked,
    /// or whose handle is held outside the store, are skipped. Returns how
    /// many were evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|user_id, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            let Ok(entry) = handle.try_lock() else {
                return true;
            };
            let idle = now
                .signed_duration_since(entry.session.updated_at)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if idle >= max_idle {
                debug!(user_id = %user_id, idle_secs = idle.as_secs(), "Evicting idle session");
                false
            } else {
                true
            }
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Idle sessions evicted");
        }
        evicted
    }
}

/// Spawn a background task that evicts idle sessions every `every`.
pub fn spawn_eviction_task(
    store: Arc<SessionStore>,
    every: Duration,
    max_idle: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.evict_idle(max_idle).await;
        }
    })
}
