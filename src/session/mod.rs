//! Session store for pending write verifications.
//!
//! Every write decision is parked here under a fresh UUID until a human
//! approves or rejects it. Sessions expire after a TTL; expiry is enforced
//! lazily when a session is looked up, and stale entries are purged on
//! every insert.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StewardError};

/// Default session lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Lifecycle state of a pending verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// Waiting for a human decision.
    Pending,
    /// Approved and (being) executed.
    Approved,
    /// Rejected; the SQL was discarded without execution.
    Rejected,
}

impl VerificationStatus {
    /// Returns the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A write decision held for human verification.
#[derive(Debug, Clone)]
pub struct PendingVerification {
    /// The session key handed back to the caller.
    pub session_id: Uuid,
    /// Target database name (lowercased).
    pub database_name: String,
    /// The proposed SQL statement.
    pub sql: String,
    /// The original natural-language request.
    pub query: String,
    /// Current lifecycle state.
    pub status: VerificationStatus,
    /// Wall-clock creation time, for display and logs.
    pub created_at: DateTime<Utc>,
    /// Monotonic creation time, for TTL checks.
    inserted_at: Instant,
}

/// Thread-safe store of pending verifications keyed by session id.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<Uuid, PendingVerification>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }
}

impl SessionStore {
    /// Creates a store with the default 15-minute TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Parks a write decision and returns its fresh session id.
    pub fn put(
        &self,
        database_name: impl Into<String>,
        sql: impl Into<String>,
        query: impl Into<String>,
    ) -> Uuid {
        let session_id = Uuid::new_v4();
        let record = PendingVerification {
            session_id,
            database_name: database_name.into(),
            sql: sql.into(),
            query: query.into(),
            status: VerificationStatus::Pending,
            created_at: Utc::now(),
            inserted_at: Instant::now(),
        };

        let mut sessions = self.sessions.lock().expect("session lock");
        sessions.retain(|_, s| s.inserted_at.elapsed() < self.ttl);
        sessions.insert(session_id, record);

        debug!(session_id = %session_id, "Write parked for verification");
        session_id
    }

    /// Returns a snapshot of the session, or an error if it is missing or
    /// past its TTL.
    pub fn get(&self, session_id: Uuid) -> Result<PendingVerification> {
        let mut sessions = self.sessions.lock().expect("session lock");
        Self::lookup(&mut sessions, session_id, self.ttl).cloned()
    }

    /// Moves a pending session to `Approved` or `Rejected` and returns the
    /// record as it was when the transition won.
    ///
    /// Exactly one caller can win this transition; every later attempt gets
    /// `InvalidTransition` carrying the status that beat it.
    pub fn transition(
        &self,
        session_id: Uuid,
        to: VerificationStatus,
    ) -> Result<PendingVerification> {
        if to == VerificationStatus::Pending {
            return Err(StewardError::internal(
                "cannot transition a session back to pending",
            ));
        }

        let mut sessions = self.sessions.lock().expect("session lock");
        let record = Self::lookup(&mut sessions, session_id, self.ttl)?;

        if record.status != VerificationStatus::Pending {
            return Err(StewardError::InvalidTransition {
                session_id,
                status: record.status.to_string(),
            });
        }

        record.status = to;
        debug!(session_id = %session_id, status = %to, "Session resolved");
        Ok(record.clone())
    }

    /// Number of live (unexpired) sessions.
    pub fn len(&self) -> usize {
        let mut sessions = self.sessions.lock().expect("session lock");
        sessions.retain(|_, s| s.inserted_at.elapsed() < self.ttl);
        sessions.len()
    }

    /// Returns true if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Finds a session, removing it if expired.
    fn lookup(
        sessions: &mut HashMap<Uuid, PendingVerification>,
        session_id: Uuid,
        ttl: Duration,
    ) -> Result<&mut PendingVerification> {
        let expired = sessions
            .get(&session_id)
            .map(|s| s.inserted_at.elapsed() >= ttl)
            .unwrap_or(false);
        if expired {
            sessions.remove(&session_id);
        }

        sessions
            .get_mut(&session_id)
            .ok_or(StewardError::UnknownOrExpiredSession(session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let store = SessionStore::new();
        let id = store.put("shop", "DELETE FROM customers WHERE id=42;", "delete customer 42");

        let record = store.get(id).unwrap();
        assert_eq!(record.session_id, id);
        assert_eq!(record.database_name, "shop");
        assert_eq!(record.status, VerificationStatus::Pending);
    }

    #[test]
    fn test_each_put_gets_distinct_id() {
        let store = SessionStore::new();
        let a = store.put("shop", "DELETE FROM a;", "q");
        let b = store.put("shop", "DELETE FROM a;", "q");
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new();
        let err = store.get(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StewardError::UnknownOrExpiredSession(_)));
    }

    #[test]
    fn test_transition_approve() {
        let store = SessionStore::new();
        let id = store.put("shop", "DELETE FROM t;", "q");

        let record = store.transition(id, VerificationStatus::Approved).unwrap();
        assert_eq!(record.status, VerificationStatus::Approved);
        assert_eq!(record.sql, "DELETE FROM t;");
    }

    #[test]
    fn test_second_transition_fails() {
        let store = SessionStore::new();
        let id = store.put("shop", "DELETE FROM t;", "q");

        store.transition(id, VerificationStatus::Approved).unwrap();
        let err = store
            .transition(id, VerificationStatus::Rejected)
            .unwrap_err();

        match err {
            StewardError::InvalidTransition { session_id, status } => {
                assert_eq!(session_id, id);
                assert_eq!(status, "approved");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_transition_to_pending_is_internal_error() {
        let store = SessionStore::new();
        let id = store.put("shop", "DELETE FROM t;", "q");

        let err = store.transition(id, VerificationStatus::Pending).unwrap_err();
        assert!(matches!(err, StewardError::Internal(_)));
    }

    #[test]
    fn test_expired_session_is_gone() {
        let store = SessionStore::with_ttl(Duration::from_millis(0));
        let id = store.put("shop", "DELETE FROM t;", "q");

        std::thread::sleep(Duration::from_millis(5));

        let err = store.get(id).unwrap_err();
        assert!(matches!(err, StewardError::UnknownOrExpiredSession(_)));

        let err = store
            .transition(id, VerificationStatus::Approved)
            .unwrap_err();
        assert!(matches!(err, StewardError::UnknownOrExpiredSession(_)));
    }

    #[test]
    fn test_put_purges_expired_sessions() {
        let store = SessionStore::with_ttl(Duration::from_millis(0));
        let first = store.put("shop", "DELETE FROM a;", "q");
        std::thread::sleep(Duration::from_millis(5));

        store.put("shop", "DELETE FROM b;", "q");

        // The first session was past its TTL when the second was inserted.
        let sessions = store.sessions.lock().unwrap();
        assert!(!sessions.contains_key(&first));
    }

    #[test]
    fn test_concurrent_transitions_have_one_winner() {
        use std::sync::Arc;

        let store = Arc::new(SessionStore::new());
        let id = store.put("shop", "DELETE FROM t;", "q");

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let to = if i % 2 == 0 {
                VerificationStatus::Approved
            } else {
                VerificationStatus::Rejected
            };
            handles.push(std::thread::spawn(move || store.transition(id, to).is_ok()));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();

        assert_eq!(wins, 1);
    }
}
