use std::collections::HashSet;

use crate::finding::Finding;

/// Identity of a finding across chunks: the clause reference ignoring case and
/// surrounding whitespace, plus the description exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    clause: String,
    description: String,
}

impl DedupKey {
    pub fn of(finding: &Finding) -> Self {
        Self {
            clause: finding.clause.trim().to_lowercase(),
            description: finding.description.clone(),
        }
    }
}

/// Drop repeated findings, keeping the first occurrence of each key in its
/// original position.
pub fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::with_capacity(findings.len());
    let before = findings.len();

    let unique: Vec<Finding> = findings
        .into_iter()
        .filter(|finding| seen.insert(DedupKey::of(finding)))
        .collect();

    if unique.len() < before {
        tracing::debug!(removed = before - unique.len(), "duplicate findings merged");
    }

    unique
}
