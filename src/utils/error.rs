//! Error Handling
//!
//! Unified error types for the orchestration core.
//! Uses thiserror for ergonomic error definitions.
//!
//! Every client-facing failure carries a stable error code (via [`AppError::code`])
//! and a retryability classification (via [`AppError::retryable`]). Unknown or
//! infrastructure errors default to non-retryable.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Session id unknown or already evicted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed session-creation or answer payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Action attempted before generation completed
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Fingerprint mismatch, or action attempted on a terminal session
    #[error("State conflict: {0}")]
    StateConflict(String),

    /// A per-call generation timeout was exceeded
    #[error("Generation timed out: {0}")]
    GenerationTimeout(String),

    /// Provider or validation error during generation
    #[error("Generation failed: {message}")]
    GenerationFailed { message: String, retryable: bool },

    /// Every specialist in a fan-out run failed with zero accumulated results
    #[error("All producers failed: {0}")]
    AllProducersFailed(String),

    /// Shell command execution errors (git unavailable, non-zero exit)
    #[error("Command error: {0}")]
    Command(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a not ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a state conflict error
    pub fn state_conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }

    /// Create a generation timeout error
    pub fn generation_timeout(msg: impl Into<String>) -> Self {
        Self::GenerationTimeout(msg.into())
    }

    /// Create a generation failed error with an explicit retryability flag
    pub fn generation_failed(msg: impl Into<String>, retryable: bool) -> Self {
        Self::GenerationFailed {
            message: msg.into(),
            retryable,
        }
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable, client-facing error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotReady(_) => "NOT_READY",
            Self::StateConflict(_) => "STATE_CONFLICT",
            Self::GenerationTimeout(_) => "GENERATION_TIMEOUT",
            Self::GenerationFailed { .. } => "GENERATION_FAILED",
            Self::AllProducersFailed(_) => "ALL_PRODUCERS_FAILED",
            Self::Command(_) => "COMMAND_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client may retry the operation that produced this error.
    ///
    /// Timeouts and transient provider failures are retryable; validation,
    /// auth, and configuration errors are not. Anything not explicitly
    /// classified defaults to non-retryable.
    pub fn retryable(&self) -> bool {
        match self {
            Self::GenerationTimeout(_) => true,
            Self::GenerationFailed { retryable, .. } => *retryable,
            Self::AllProducersFailed(_) => true,
            _ => false,
        }
    }
}

/// Convert AppError to a string suitable for transport-layer responses
impl From<AppError> for String {
    fn from(err: AppError) -> String {
        err.to_string()
    }
}
