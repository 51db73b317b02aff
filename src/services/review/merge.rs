//! Finding Merge
//!
//! Pure accumulation of specialist findings into the session result. Merging
//! happens on the orchestrator task only, once per completed specialist, so
//! these functions never see concurrent writers.

use std::collections::HashSet;

use crate::models::finding::{Finding, FindingType, Severity};

/// Deduplication key: everything identity-relevant except the reporting
/// agent and the id digest, so two specialists flagging the same line agree.
type DedupKey = (
    Severity,
    FindingType,
    String,
    String,
    Option<u32>,
    Option<u32>,
);

fn dedup_key(finding: &Finding) -> DedupKey {
    (
        finding.severity,
        finding.finding_type,
        finding.title.clone(),
        finding.path.clone(),
        finding.line_start,
        finding.line_end,
    )
}

/// Merge newly settled findings into the accumulated set.
///
/// First reporter wins on duplicates; the result is re-sorted by severity
/// (critical first), then path, then start line.
pub fn merge_findings(accumulated: Vec<Finding>, incoming: Vec<Finding>) -> Vec<Finding> {
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut merged = Vec::with_capacity(accumulated.len() + incoming.len());
    for finding in accumulated.into_iter().chain(incoming) {
        if seen.insert(dedup_key(&finding)) {
            merged.push(finding);
        }
    }
    merged.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| a.path.cmp(&b.path))
            .then_with(|| a.line_start.cmp(&b.line_start))
    });
    merged
}
