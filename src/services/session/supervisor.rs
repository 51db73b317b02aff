//! Run Supervisor
//!
//! Enforces at-most-one live generation run per slot. Starting a new run
//! cancels the previous run's token, finalizes its session as cancelled, and
//! emits its terminal events — all before the new run is registered, so
//! there is never a window with two live runs for the same slot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::models::events::SessionEvent;
use crate::models::session::{SessionProgress, SessionSlot, SessionStatus};

use super::events::EventHub;
use super::store::SessionStore;

struct ActiveRun {
    session_id: String,
    token: CancellationToken,
}

/// Per-slot run registry.
pub struct RunSupervisor {
    runs: Mutex<HashMap<SessionSlot, ActiveRun>>,
    store: Arc<SessionStore>,
    events: Arc<EventHub>,
}

impl RunSupervisor {
    pub fn new(store: Arc<SessionStore>, events: Arc<EventHub>) -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            store,
            events,
        }
    }

    /// Preempt any live run for the slot, then register the new one.
    ///
    /// The returned token is owned by the new run; the orchestrator must
    /// check it at every producer boundary.
    pub async fn begin(&self, slot: SessionSlot, session_id: &str) -> CancellationToken {
        let mut runs = self.runs.lock().await;
        if let Some(previous) = runs.remove(&slot) {
            tracing::info!(
                "preempting {} run for session {}",
                slot.as_str(),
                previous.session_id
            );
            self.finalize_cancelled(previous, "Superseded by a newer run")
                .await;
        }
        let token = CancellationToken::new();
        runs.insert(
            slot,
            ActiveRun {
                session_id: session_id.to_string(),
                token: token.clone(),
            },
        );
        token
    }

    /// Forget a finished run, if it is still the registered one.
    pub async fn finish(&self, slot: SessionSlot, session_id: &str) {
        let mut runs = self.runs.lock().await;
        if runs
            .get(&slot)
            .map(|run| run.session_id == session_id)
            .unwrap_or(false)
        {
            runs.remove(&slot);
        }
    }

    /// Cancel by session id (explicit client cancel). Idempotent: returns
    /// false when the session has no live run to cancel.
    pub async fn cancel_session(&self, session_id: &str) -> bool {
        let run = {
            let mut runs = self.runs.lock().await;
            let slot = runs
                .iter()
                .find(|(_, run)| run.session_id == session_id)
                .map(|(slot, _)| *slot);
            slot.and_then(|slot| runs.remove(&slot))
        };
        match run {
            Some(run) => {
                self.finalize_cancelled(run, "Cancelled by client").await;
                true
            }
            None => false,
        }
    }

    /// Cancel the token and finalize the session as cancelled, emitting its
    /// terminal events. Skips sessions that already reached a terminal state
    /// (e.g. the run finished just before preemption).
    async fn finalize_cancelled(&self, run: ActiveRun, message: &str) {
        run.token.cancel();
        let finalized = self
            .store
            .update_active(&run.session_id, |session| {
                session.status = SessionStatus::Cancelled;
                session.progress = SessionProgress::new("finalizing", 100, message);
            })
            .await;
        if let Some(session) = finalized {
            self.events
                .publish(SessionEvent::Status {
                    session_id: session.id.clone(),
                    status: session.status,
                    progress: session.progress.clone(),
                })
                .await;
            self.events
                .publish(SessionEvent::Complete {
                    session_id: session.id,
                    status: SessionStatus::Cancelled,
                })
                .await;
        }
    }
}
