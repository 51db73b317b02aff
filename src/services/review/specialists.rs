//! Review Specialists
//!
//! The fixed roster of review perspectives, their prompts, and tolerant
//! normalization of raw specialist payloads into typed findings.

use serde_json::Value;

use crate::models::finding::{Finding, FindingType, Severity};
use crate::services::provider::{extract_json_object, SpecialistRequest};
use crate::utils::error::{AppError, AppResult};

/// One entry in the specialist roster.
#[derive(Debug, Clone, Copy)]
pub struct Specialist {
    /// Stable agent name, also reported on findings
    pub name: &'static str,
    /// One-line focus statement injected into the prompt
    pub focus: &'static str,
    /// Finding type assumed when the payload omits or garbles one
    pub default_type: FindingType,
}

/// The fan-out roster. Fixed per process; every review session runs all of
/// these.
pub const SPECIALISTS: [Specialist; 4] = [
    Specialist {
        name: "security",
        focus: "injection, secrets in code, unsafe deserialization, and missing authorization checks",
        default_type: FindingType::Security,
    },
    Specialist {
        name: "correctness",
        focus: "logic errors, unhandled edge cases, race conditions, and broken invariants",
        default_type: FindingType::Correctness,
    },
    Specialist {
        name: "performance",
        focus: "accidental quadratic work, blocking calls on hot paths, and unbounded allocation",
        default_type: FindingType::Performance,
    },
    Specialist {
        name: "maintainability",
        focus: "misleading names, duplicated logic, and code that hides its intent",
        default_type: FindingType::Maintainability,
    },
];

/// Build the prompt for one specialist call.
pub fn build_specialist_prompt(request: &SpecialistRequest) -> String {
    format!(
        r#"You are the {agent} reviewer on a pre-commit review panel. Focus exclusively on: {focus}.

Review only the changes below. Report real problems, not nitpicks; an empty findings list is a valid answer.

Respond in this exact JSON format:
{{
  "findings": [
    {{
      "title": "SQL built by string concatenation",
      "summary": "User input flows into the query string without binding.",
      "severity": "high",
      "type": "{agent}",
      "path": "src/db.rs",
      "lineStart": 42,
      "lineEnd": 45
    }}
  ]
}}

severity is one of: critical, high, medium, low.

Changed files:
{files}

Diff:
```
{context}
```"#,
        agent = request.agent,
        focus = request.focus,
        files = request.focus_files.join("\n"),
        context = request.prompt_context,
    )
}

/// Normalize a raw specialist payload into typed findings.
///
/// Entries without a title are skipped; unknown severities fall back to
/// medium and unknown types to the specialist's default. An unparseable
/// payload is a retryable failure (the specialist produced garbage, a rerun
/// may not).
pub fn normalize_findings(
    session_id: &str,
    specialist: &Specialist,
    raw: &Value,
) -> AppResult<Vec<Finding>> {
    let payload = match raw {
        Value::String(text) => extract_json_object(text).ok_or_else(|| {
            AppError::generation_failed(
                format!("{} specialist returned no JSON payload", specialist.name),
                true,
            )
        })?,
        other => other.clone(),
    };

    let raw_findings = match payload.get("findings") {
        Some(Value::Array(entries)) => entries.clone(),
        // A bare array is close enough
        None if payload.is_array() => payload.as_array().cloned().unwrap_or_default(),
        _ => Vec::new(),
    };

    let mut findings = Vec::new();
    for (ordinal, entry) in raw_findings.iter().enumerate() {
        let Some(title) = entry.get("title").and_then(Value::as_str) else {
            continue;
        };
        let severity = entry
            .get("severity")
            .and_then(Value::as_str)
            .map(Severity::parse_lenient)
            .unwrap_or(Severity::Medium);
        let finding_type = entry
            .get("type")
            .and_then(Value::as_str)
            .map(|raw| FindingType::parse_lenient(raw, specialist.default_type))
            .unwrap_or(specialist.default_type);
        let summary = entry
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let path = entry
            .get("path")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let line_start = entry
            .get("lineStart")
            .and_then(Value::as_u64)
            .map(|l| l as u32);
        let line_end = entry
            .get("lineEnd")
            .and_then(Value::as_u64)
            .map(|l| l as u32)
            // A single-line finding may report only lineStart
            .or(line_start);

        findings.push(Finding {
            id: Finding::compute_id(
                session_id,
                specialist.name,
                &path,
                line_start,
                line_end,
                severity,
                finding_type,
                title,
                ordinal,
            ),
            severity,
            finding_type,
            title: title.to_string(),
            summary,
            path,
            line_start,
            line_end,
            agent: specialist.name.to_string(),
        });
    }
    Ok(findings)
}
