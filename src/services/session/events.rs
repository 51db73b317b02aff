//! Event Channel
//!
//! Per-session push channel delivering ordered events to at most one active
//! subscriber. A late subscriber receives a synthetic replay of the current
//! state (and, for a terminal session, the matching error/complete pair) so
//! it observes the same terminal outcome an early subscriber would have.
//! Intermediate partial results that were missed are not replayed; only
//! final state is guaranteed.

use std::collections::HashMap;

use tokio::sync::{mpsc, Mutex};

use crate::models::events::SessionEvent;
use crate::models::session::{GateSession, SessionStatus};

/// Hub of per-session subscriber channels.
pub struct EventHub {
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<SessionEvent>>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a subscriber to a session, replacing any previous one (the old
    /// receiver's stream ends). The returned receiver first yields the
    /// synthetic replay, then live events until `Complete`.
    pub async fn subscribe(&self, session: &GateSession) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in replay_events(session) {
            let _ = tx.send(event);
        }
        if session.status.is_terminal() {
            // Replay already ended with Complete; do not register the sender,
            // so the stream closes once drained.
            return rx;
        }
        let mut senders = self.senders.lock().await;
        senders.insert(session.id.clone(), tx);
        rx
    }

    /// Fire-and-forget publish. A detached subscriber never affects the run.
    pub async fn publish(&self, event: SessionEvent) {
        let mut senders = self.senders.lock().await;
        let session_id = event.session_id().to_string();
        let terminal = event.is_complete();
        if let Some(tx) = senders.get(&session_id) {
            let _ = tx.send(event);
        }
        if terminal {
            senders.remove(&session_id);
        }
    }

    /// Drop a session's channel (eviction).
    pub async fn teardown(&self, session_id: &str) {
        let mut senders = self.senders.lock().await;
        senders.remove(session_id);
    }
}

/// Build the synthetic replay for a subscriber attaching now.
fn replay_events(session: &GateSession) -> Vec<SessionEvent> {
    let mut events = vec![SessionEvent::Status {
        session_id: session.id.clone(),
        status: session.status,
        progress: session.progress.clone(),
    }];
    if session.status.is_terminal() {
        if session.status == SessionStatus::Failed {
            if let Some(failure) = &session.failure {
                events.push(SessionEvent::Error {
                    session_id: session.id.clone(),
                    code: failure.code.clone(),
                    message: failure.message.clone(),
                    retryable: failure.retryable,
                });
            }
        }
        events.push(SessionEvent::Complete {
            session_id: session.id.clone(),
            status: session.status,
        });
    }
    events
}
