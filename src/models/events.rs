//! Session Events
//!
//! Ordered per-session events pushed to the subscriber stream.

use serde::{Deserialize, Serialize};

use super::finding::Finding;
use super::session::{SessionProgress, SessionStatus};

/// One event on a session's push channel.
///
/// A session's stream always ends with exactly one `Complete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// Progress or status changed.
    #[serde(rename_all = "camelCase")]
    Status {
        session_id: String,
        status: SessionStatus,
        progress: SessionProgress,
    },
    /// One specialist completed; carries its merged-in findings (review only).
    #[serde(rename_all = "camelCase")]
    ResultPartial {
        session_id: String,
        agent: String,
        findings: Vec<Finding>,
    },
    /// Terminal failure.
    #[serde(rename_all = "camelCase")]
    Error {
        session_id: String,
        code: String,
        message: String,
        retryable: bool,
    },
    /// Terminal marker; the subscription ends after this.
    #[serde(rename_all = "camelCase")]
    Complete {
        session_id: String,
        status: SessionStatus,
    },
}

impl SessionEvent {
    /// The session this event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            SessionEvent::Status { session_id, .. }
            | SessionEvent::ResultPartial { session_id, .. }
            | SessionEvent::Error { session_id, .. }
            | SessionEvent::Complete { session_id, .. } => session_id,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SessionEvent::Complete { .. })
    }
}
