//! Review Findings
//!
//! Normalized issues reported by review specialists, with deterministic
//! identities so retried or re-emitted findings collapse to the same id.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Finding severity, totally ordered for sort purposes (critical first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort rank: lower ranks sort first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::High => 1,
            Severity::Medium => 2,
            Severity::Low => 3,
        }
    }

    /// Parse a provider-supplied severity string. Unknown values map to
    /// `Medium`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Security,
    Correctness,
    Performance,
    Maintainability,
}

impl FindingType {
    /// Parse a provider-supplied type string, falling back to the
    /// specialist's default type on unknown values.
    pub fn parse_lenient(raw: &str, default: FindingType) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "security" => FindingType::Security,
            "correctness" => FindingType::Correctness,
            "performance" => FindingType::Performance,
            "maintainability" => FindingType::Maintainability,
            _ => default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FindingType::Security => "security",
            FindingType::Correctness => "correctness",
            FindingType::Performance => "performance",
            FindingType::Maintainability => "maintainability",
        }
    }
}

/// One normalized issue reported by a review specialist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Deterministic digest of the finding's canonical tuple
    pub id: String,
    /// Severity classification
    pub severity: Severity,
    /// Finding category
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    /// Short title
    pub title: String,
    /// Longer explanation
    pub summary: String,
    /// Repository-relative path the finding refers to
    pub path: String,
    /// First affected line, if the specialist reported one
    pub line_start: Option<u32>,
    /// Last affected line, if the specialist reported one
    pub line_end: Option<u32>,
    /// Name of the specialist that produced the finding
    pub agent: String,
}

impl Finding {
    /// Compute the deterministic id for a finding.
    ///
    /// The digest covers `(session_id, agent, path, line_start, line_end,
    /// severity, type, title, ordinal)` so identical findings re-emitted by a
    /// retry collapse to the same identity. Stability matters here, not
    /// adversarial collision resistance.
    pub fn compute_id(
        session_id: &str,
        agent: &str,
        path: &str,
        line_start: Option<u32>,
        line_end: Option<u32>,
        severity: Severity,
        finding_type: FindingType,
        title: &str,
        ordinal: usize,
    ) -> String {
        let mut hasher = Sha256::new();
        for part in [
            session_id,
            agent,
            path,
            &line_start.map_or(String::new(), |l| l.to_string()),
            &line_end.map_or(String::new(), |l| l.to_string()),
            severity.as_str(),
            finding_type.as_str(),
            title,
            &ordinal.to_string(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        // 16 hex chars is plenty for within-session uniqueness
        digest
            .iter()
            .take(8)
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
