//! Session Store
//!
//! In-memory table of gate sessions. Callers only ever receive cloned
//! snapshots; mutation goes through closure-based writers so there is a
//! single mutation discipline per session. Sessions are evicted by age and
//! by a count cap, never persisted.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::models::session::GateSession;
use crate::utils::error::{AppError, AppResult};

/// Sessions untouched for this long are evicted.
pub const SESSION_TTL: Duration = Duration::from_secs(60 * 60);
/// Hard cap on retained sessions; oldest are evicted beyond it.
pub const SESSION_CAP: usize = 200;

/// In-memory session table.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, GateSession>>,
    ttl: chrono::Duration,
    cap: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_limits(SESSION_TTL, SESSION_CAP)
    }

    /// Construct with explicit eviction limits (tests shrink these).
    pub fn with_limits(ttl: Duration, cap: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::hours(1)),
            cap,
        }
    }

    /// Insert a freshly created session.
    pub async fn insert(&self, session: GateSession) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session.id.clone(), session);
    }

    /// Snapshot of a session, or `NotFound`.
    pub async fn get(&self, id: &str) -> AppResult<GateSession> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))
    }

    /// Mutate a session and return the updated snapshot. Bumps `updated_at`.
    pub async fn update<F>(&self, id: &str, f: F) -> AppResult<GateSession>
    where
        F: FnOnce(&mut GateSession),
    {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;
        f(session);
        session.updated_at = Utc::now();
        Ok(session.clone())
    }

    /// Mutate a session only if it has not reached a terminal state.
    ///
    /// Returns `None` (a silent no-op) when the session is terminal or was
    /// already evicted — this is what makes late producer results from
    /// cancelled or superseded runs harmless.
    pub async fn update_active<F>(&self, id: &str, f: F) -> Option<GateSession>
    where
        F: FnOnce(&mut GateSession),
    {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(id)?;
        if session.status.is_terminal() {
            return None;
        }
        f(session);
        session.updated_at = Utc::now();
        Some(session.clone())
    }

    /// Evict stale sessions, then enforce the count cap oldest-first.
    ///
    /// Returns the evicted ids so the caller can tear down event channels.
    pub async fn sweep(&self) -> Vec<String> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let mut evicted: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| now - s.updated_at > self.ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &evicted {
            sessions.remove(id);
        }

        if sessions.len() > self.cap {
            let mut by_age: Vec<(String, chrono::DateTime<Utc>)> = sessions
                .iter()
                .map(|(id, s)| (id.clone(), s.updated_at))
                .collect();
            by_age.sort_by_key(|(_, updated_at)| *updated_at);
            let excess = sessions.len() - self.cap;
            for (id, _) in by_age.into_iter().take(excess) {
                sessions.remove(&id);
                evicted.push(id);
            }
        }

        if !evicted.is_empty() {
            tracing::debug!("evicted {} session(s)", evicted.len());
        }
        evicted
    }

    /// Number of retained sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}
