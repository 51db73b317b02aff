//! Generation Timeouts
//!
//! Per-call timeout racing for long-latency provider calls, with
//! environment-configurable durations clamped to a safe range.

use std::future::Future;
use std::time::Duration;

use crate::utils::error::{AppError, AppResult};

/// Minimum accepted timeout, in seconds.
pub const MIN_TIMEOUT_SECS: u64 = 5;
/// Maximum accepted timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Default per-specialist timeout for review generation.
pub const DEFAULT_REVIEW_TIMEOUT_SECS: u64 = 45;
/// Default timeout for quiz generation.
pub const DEFAULT_QUIZ_TIMEOUT_SECS: u64 = 60;

/// Environment variable overriding the review timeout.
pub const REVIEW_TIMEOUT_ENV: &str = "COMMIT_GATE_REVIEW_TIMEOUT_SECS";
/// Environment variable overriding the quiz timeout.
pub const QUIZ_TIMEOUT_ENV: &str = "COMMIT_GATE_QUIZ_TIMEOUT_SECS";

/// Read a timeout from an environment variable, in whole seconds.
///
/// Invalid or out-of-range values silently fall back to `default_secs`.
pub fn timeout_from_env(var: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(var)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|secs| (MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(secs))
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

/// Race an operation against a timer.
///
/// On expiry the operation is abandoned (dropped, not awaited further) and a
/// [`AppError::GenerationTimeout`] is returned. Abandonment is best-effort:
/// callers must be prepared to discard a late result that was already in
/// flight elsewhere.
pub async fn with_timeout<T>(
    label: &str,
    duration: Duration,
    op: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    match tokio::time::timeout(duration, op).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                "{} timed out after {}s",
                label,
                duration.as_secs()
            );
            Err(AppError::generation_timeout(format!(
                "{} exceeded {}s",
                label,
                duration.as_secs()
            )))
        }
    }
}
