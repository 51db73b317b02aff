//! Gate Sessions
//!
//! The unit of orchestrated work: one generation run of either the commit
//! readiness quiz or the multi-specialist code review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finding::Finding;
use super::quiz::{Quiz, QuizGrade};

/// Logical single-flight key: the one active generation at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionSlot {
    Quiz,
    Review,
}

impl SessionSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSlot::Quiz => "quiz",
            SessionSlot::Review => "review",
        }
    }
}

/// Session lifecycle status.
///
/// Reachable transitions: `Queued -> Running -> {Ready | Failed}`,
/// `Ready -> Validated` (quiz only), `{Queued, Running} -> Cancelled`
/// (preemption or explicit client cancel only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Queued,
    Running,
    Ready,
    Failed,
    Cancelled,
    Validated,
}

impl SessionStatus {
    /// Terminal states admit no further producer-driven mutation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Ready
                | SessionStatus::Failed
                | SessionStatus::Cancelled
                | SessionStatus::Validated
        )
    }
}

/// Best-effort human-readable progress of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    /// Coarse phase label ("queued", "context", "generating", ...)
    pub phase: String,
    /// 0-100, monotonically non-decreasing within a run
    pub percent: u8,
    /// Human-readable status line
    pub message: String,
}

impl SessionProgress {
    pub fn new(phase: impl Into<String>, percent: u8, message: impl Into<String>) -> Self {
        Self {
            phase: phase.into(),
            percent: percent.min(100),
            message: message.into(),
        }
    }
}

/// Terminal failure details, kept queryable after the run ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFailure {
    /// Stable error code, as carried on the live `Error` event
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Whether re-triggering generation is worthwhile
    pub retryable: bool,
}

/// Accumulated review payload; may fill incrementally while the run is live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    /// Merged, deduplicated, severity-sorted findings
    pub findings: Vec<Finding>,
    /// Specialists that completed successfully
    pub agents_completed: Vec<String>,
}

/// Accumulated quiz payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// The generated quiz
    pub quiz: Quiz,
    /// Grade, present once answers were submitted
    pub grade: Option<QuizGrade>,
}

/// Session payload, shaped by the slot that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionResult {
    Quiz(QuizResult),
    Review(ReviewResult),
}

impl SessionResult {
    pub fn as_quiz(&self) -> Option<&QuizResult> {
        match self {
            SessionResult::Quiz(quiz) => Some(quiz),
            SessionResult::Review(_) => None,
        }
    }

    pub fn as_review(&self) -> Option<&ReviewResult> {
        match self {
            SessionResult::Review(review) => Some(review),
            SessionResult::Quiz(_) => None,
        }
    }
}

/// One orchestrated generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateSession {
    /// Opaque unique identifier, immutable after creation
    pub id: String,
    /// Slot this session occupies
    pub slot: SessionSlot,
    /// Lifecycle status
    pub status: SessionStatus,
    /// Snapshot token of the repository state the session was built from.
    /// Empty until the run resolves its context.
    pub source_fingerprint: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp; drives eviction
    pub updated_at: DateTime<Utc>,
    /// Best-effort progress
    pub progress: SessionProgress,
    /// Accumulated payload, None until the first producer completes
    pub result: Option<SessionResult>,
    /// Terminal failure details
    pub failure: Option<SessionFailure>,
}

impl GateSession {
    /// Create a fresh queued session for a slot.
    pub fn new(slot: SessionSlot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            slot,
            status: SessionStatus::Queued,
            source_fingerprint: String::new(),
            created_at: now,
            updated_at: now,
            progress: SessionProgress::new("queued", 0, "Session queued"),
            result: None,
            failure: None,
        }
    }
}
