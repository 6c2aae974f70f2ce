//! Session state record for sticky routing.

use chrono::{DateTime, Duration, Utc};

/// One conversation's sticky-routing state: which agent the thread is stuck
/// to, and when it was last active. Owned exclusively by
/// [`SessionStore`](super::SessionStore).
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub thread_id: String,
    pub agent_id: String,
    /// The agent's primary `@mention` handle at the time of routing.
    pub agent_handle: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        thread_id: impl Into<String>,
        agent_id: impl Into<String>,
        agent_handle: impl Into<String>,
    ) -> SessionState {
        let now = Utc::now();
        SessionState {
            thread_id: thread_id.into(),
            agent_id: agent_id.into(),
            agent_handle: agent_handle.into(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Bumps `last_activity` to now.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whether the session has expired at `now`. The contract is strict:
    /// expired iff `now > last_activity + timeout`.
    pub fn is_expired_at(&self, timeout_minutes: u64, now: DateTime<Utc>) -> bool {
        now > self.last_activity + Duration::minutes(timeout_minutes as i64)
    }

    /// Whether the session has expired as of the current clock.
    pub fn is_expired(&self, timeout_minutes: u64) -> bool {
        self.is_expired_at(timeout_minutes, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: a session expires strictly after last_activity plus the
    /// timeout; exactly at the boundary it is still live.
    #[test]
    fn expiry_is_strictly_greater_than() {
        let session = SessionState::new("t1", "a1", "a");
        let boundary = session.last_activity + Duration::minutes(30);
        assert!(!session.is_expired_at(30, boundary));
        assert!(session.is_expired_at(30, boundary + Duration::milliseconds(1)));
        assert!(!session.is_expired_at(30, session.last_activity));
    }

    /// **Scenario**: touch moves last_activity forward, extending the TTL.
    #[test]
    fn touch_extends_ttl() {
        let mut session = SessionState::new("t1", "a1", "a");
        let old_activity = session.last_activity;
        session.touch();
        assert!(session.last_activity >= old_activity);
        assert_eq!(session.created_at, old_activity);
    }
}
