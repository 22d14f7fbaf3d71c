use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AnalysisKind;

const SENTINEL_MARKER: &str = "NONE";
const SCORE_PENALTY: u32 = 20;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid severity: {0}")]
pub struct InvalidSeverity(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = InvalidSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(InvalidSeverity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub section: String,
    pub clause: String,
    pub description: String,
    pub severity: Severity,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// Set only on [`Finding::no_issues`]; a model finding that happens to
    /// read "NONE" is still a finding.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
}

impl Finding {
    #[must_use]
    pub fn new(
        section: impl Into<String>,
        clause: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            clause: clause.into(),
            description: description.into(),
            severity,
            recommendation: recommendation.into(),
            snippet: None,
            placeholder: false,
        }
    }

    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    /// The single placeholder that stands for "the analysis found nothing".
    #[must_use]
    pub fn no_issues() -> Self {
        Self {
            placeholder: true,
            ..Self::new(
                SENTINEL_MARKER,
                SENTINEL_MARKER,
                "No issues detected.",
                Severity::Low,
                "No action required.",
            )
        }
    }

    pub const fn is_sentinel(&self) -> bool {
        self.placeholder
    }
}

/// The deduplicated result of analysing one document. Never empty: a clean
/// document carries exactly one [`Finding::no_issues`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedReport {
    pub kind: AnalysisKind,
    pub findings: Vec<Finding>,
    pub chunks_total: usize,
    pub chunks_analyzed: usize,
    pub chunks_failed: usize,
    /// False when analysis stopped before every chunk was attempted.
    pub complete: bool,
}

impl ConsolidatedReport {
    #[must_use]
    pub fn new(kind: AnalysisKind, findings: Vec<Finding>) -> Self {
        let findings = if findings.is_empty() {
            vec![Finding::no_issues()]
        } else {
            findings
        };

        Self {
            kind,
            findings,
            chunks_total: 0,
            chunks_analyzed: 0,
            chunks_failed: 0,
            complete: true,
        }
    }

    #[must_use]
    pub const fn with_chunk_counts(mut self, total: usize, analyzed: usize, failed: usize) -> Self {
        self.chunks_total = total;
        self.chunks_analyzed = analyzed;
        self.chunks_failed = failed;
        self.complete = analyzed == total;
        self
    }

    pub fn is_clean(&self) -> bool {
        self.findings.iter().all(Finding::is_sentinel)
    }

    pub fn real_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.is_sentinel())
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.real_findings().filter(|f| f.severity == severity).count()
    }

    /// Heuristic 0..=100 score: every real finding costs twenty points.
    pub fn compliance_score(&self) -> u32 {
        let count = u32::try_from(self.real_findings().count()).unwrap_or(u32::MAX);
        100u32.saturating_sub(count.saturating_mul(SCORE_PENALTY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(clause: &str) -> Finding {
        Finding::new("S1", clause, "desc", Severity::High, "fix it")
    }

    #[test]
    fn test_severity_parse_is_case_insensitive() {
        assert_eq!("HIGH".parse::<Severity>(), Ok(Severity::High));
        assert_eq!(" medium ".parse::<Severity>(), Ok(Severity::Medium));
        assert_eq!("low".parse::<Severity>(), Ok(Severity::Low));
        assert!("critical".parse::<Severity>().is_err());
    }

    #[test]
    fn test_empty_report_gets_sentinel() {
        let report = ConsolidatedReport::new(AnalysisKind::Risk, Vec::new());
        assert_eq!(report.findings.len(), 1);
        assert!(report.findings[0].is_sentinel());
        assert!(report.is_clean());
        assert_eq!(report.compliance_score(), 100);
    }

    #[test]
    fn test_model_none_finding_is_not_the_sentinel() {
        let reported = Finding::new("NONE", "NONE", "No governing law clause", Severity::Medium, "Add one");
        assert!(!reported.is_sentinel());

        let report = ConsolidatedReport::new(AnalysisKind::Compliance, vec![reported]);
        assert!(!report.is_clean());
        assert_eq!(report.real_findings().count(), 1);
        assert_eq!(report.compliance_score(), 80);
    }

    #[test]
    fn test_sentinel_survives_serde() {
        let report = ConsolidatedReport::new(AnalysisKind::Risk, Vec::new());
        let json = serde_json::to_string(&report).unwrap();
        let back: ConsolidatedReport = serde_json::from_str(&json).unwrap();
        assert!(back.is_clean());

        let plain = serde_json::to_value(finding("a")).unwrap();
        assert!(plain.get("placeholder").is_none());
    }

    #[test]
    fn test_compliance_score() {
        let report = ConsolidatedReport::new(
            AnalysisKind::Compliance,
            vec![finding("a"), finding("b"), finding("c")],
        );
        assert_eq!(report.compliance_score(), 40);

        let many = (0..7).map(|i| finding(&i.to_string())).collect();
        let report = ConsolidatedReport::new(AnalysisKind::Compliance, many);
        assert_eq!(report.compliance_score(), 0);
    }

    #[test]
    fn test_chunk_counts_mark_incomplete() {
        let report = ConsolidatedReport::new(AnalysisKind::Risk, vec![finding("a")])
            .with_chunk_counts(3, 2, 0);
        assert!(!report.complete);
        assert_eq!(report.count_by_severity(Severity::High), 1);
    }

    #[test]
    fn test_snippet_is_skipped_when_absent() {
        let json = serde_json::to_value(finding("a")).unwrap();
        assert!(json.get("snippet").is_none());

        let json = serde_json::to_value(finding("a").with_snippet("x")).unwrap();
        assert_eq!(json["snippet"], "x");
    }
}
