//! In-memory session store with lazy TTL expiration.

use std::collections::HashMap;
use std::sync::Mutex;

use super::SessionState;

/// Thread-safe in-memory session store keyed by thread id.
///
/// Expiration is lazy: probing an expired entry deletes it inline, and
/// [`SessionStore::cleanup_expired`] batch-removes the rest. All operations
/// take one mutex for map access only; no I/O happens under the lock.
///
/// Process-local; horizontal scaling needs a distributed store instead.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
    timeout_minutes: u64,
}

impl SessionStore {
    pub fn new(timeout_minutes: u64) -> SessionStore {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            timeout_minutes,
        }
    }

    pub fn timeout_minutes(&self) -> u64 {
        self.timeout_minutes
    }

    /// Returns the live session for `thread_id`, deleting it inline when
    /// expired.
    pub fn get(&self, thread_id: &str) -> Option<SessionState> {
        let mut sessions = self.lock();
        match sessions.get(thread_id) {
            None => None,
            Some(session) if session.is_expired(self.timeout_minutes) => {
                tracing::debug!(
                    "session expired (thread_id={}, agent_id={}, last_activity={})",
                    thread_id,
                    session.agent_id,
                    session.last_activity.to_rfc3339()
                );
                sessions.remove(thread_id);
                None
            }
            Some(session) => Some(session.clone()),
        }
    }

    /// Creates or replaces the session for `thread_id`.
    pub fn set(
        &self,
        thread_id: &str,
        agent_id: &str,
        agent_handle: &str,
    ) -> SessionState {
        let session = SessionState::new(thread_id, agent_id, agent_handle);
        let mut sessions = self.lock();
        if let Some(existing) = sessions.get(thread_id) {
            tracing::debug!(
                "replacing session (thread_id={}, old_agent={}, new_agent={})",
                thread_id,
                existing.agent_id,
                agent_id
            );
        } else {
            tracing::debug!("creating session (thread_id={}, agent_id={})", thread_id, agent_id);
        }
        sessions.insert(thread_id.to_string(), session.clone());
        session
    }

    /// Bumps `last_activity`; false when the session is missing or expired
    /// (expired entries are removed).
    pub fn touch(&self, thread_id: &str) -> bool {
        let mut sessions = self.lock();
        match sessions.get_mut(thread_id) {
            None => false,
            Some(session) if session.is_expired(self.timeout_minutes) => {
                sessions.remove(thread_id);
                false
            }
            Some(session) => {
                session.touch();
                true
            }
        }
    }

    /// Deletes the session; false when it was not present.
    pub fn delete(&self, thread_id: &str) -> bool {
        let mut sessions = self.lock();
        if sessions.remove(thread_id).is_some() {
            tracing::debug!("deleting session (thread_id={})", thread_id);
            true
        } else {
            false
        }
    }

    /// Batch-removes every expired session; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.timeout_minutes));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!("cleaned up {} expired sessions", removed);
        }
        removed
    }

    /// Number of stored sessions, including not-yet-probed expired ones.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Removes all sessions.
    pub fn clear(&self) {
        let mut sessions = self.lock();
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            tracing::info!("cleared {} sessions", count);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, SessionState>> {
        // Recover from poisoning; the map stays structurally sound.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    fn backdate(&self, thread_id: &str, minutes: u64) {
        let mut sessions = self.lock();
        if let Some(session) = sessions.get_mut(thread_id) {
            session.last_activity =
                session.last_activity - chrono::Duration::minutes(minutes as i64 + 1);
        }
    }
}
