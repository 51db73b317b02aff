//! Agent Provider Trait
//!
//! Seam between the orchestration core and whatever AI SDK actually serves
//! generation. Providers return raw JSON payloads; the schema validators in
//! the quiz and review services normalize them into typed results. Provider
//! errors must already be mapped into the `AppError` taxonomy: transient
//! failures as retryable `GenerationFailed`, auth/model-configuration
//! problems as non-retryable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utils::error::AppResult;

/// Request for a quiz generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    /// Files the quiz should cover
    pub focus_files: Vec<String>,
    /// Bounded diff excerpt
    pub prompt_context: String,
    /// Number of questions to generate
    pub question_count: u8,
}

/// Request for one review specialist call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialistRequest {
    /// Specialist name ("security", "correctness", ...)
    pub agent: String,
    /// One-line description of the specialist's focus area
    pub focus: String,
    /// Files under review
    pub focus_files: Vec<String>,
    /// Bounded diff excerpt
    pub prompt_context: String,
}

/// Interface every AI provider must implement.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Generate a commit-readiness quiz from the given context.
    ///
    /// Returns the raw provider payload; the caller normalizes it.
    async fn generate_quiz(&self, request: QuizRequest) -> AppResult<serde_json::Value>;

    /// Run one review specialist over the given context.
    ///
    /// Returns the raw provider payload; the caller normalizes it.
    async fn run_specialist(&self, request: SpecialistRequest) -> AppResult<serde_json::Value>;
}

/// Extract the first JSON object embedded in a free-form provider response.
///
/// Providers frequently wrap their JSON in prose or code fences; try a direct
/// parse first, then the outermost brace span.
pub fn extract_json_object(response: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(response) {
        if value.is_object() || value.is_array() {
            return Some(value);
        }
    }
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}
