use serde_json::{Map, Value};
use thiserror::Error;

use super::prompt::AnalysisKind;
use crate::finding::{Finding, InvalidSeverity, Severity};

const FINDING_KEYS: [&str; 3] = ["risks", "issues", "findings"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Finding is not a JSON object")]
    NotAnObject,
    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Severity(#[from] InvalidSeverity),
}

/// How a model response was turned into findings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedFindings {
    /// The response was JSON carrying a findings array
    Clean(Vec<Finding>),
    /// Recovered from a JSON object embedded in other text
    Salvaged(Vec<Finding>),
    Unparseable,
}

impl ParsedFindings {
    pub fn into_findings(self) -> Vec<Finding> {
        match self {
            Self::Clean(findings) | Self::Salvaged(findings) => findings,
            Self::Unparseable => Vec::new(),
        }
    }
}

/// Parse a raw model response: strictly first, then by salvage.
pub fn parse_findings(raw: &str, kind: AnalysisKind) -> ParsedFindings {
    if let Ok(value) = serde_json::from_str::<Value>(raw.trim()) {
        if let Some(findings) = findings_from_value(&value, kind) {
            return ParsedFindings::Clean(findings);
        }
    }

    match salvage(raw, kind) {
        Some(findings) => {
            tracing::warn!(findings = findings.len(), "model response salvaged from non-JSON output");
            ParsedFindings::Salvaged(findings)
        }
        None => ParsedFindings::Unparseable,
    }
}

/// Recover findings from a response that is not pure JSON, such as prose
/// around a fenced code block. Returns an empty list when nothing usable is
/// found.
pub fn salvage_findings(raw: &str, kind: AnalysisKind) -> Vec<Finding> {
    salvage(raw, kind).unwrap_or_default()
}

fn salvage(raw: &str, kind: AnalysisKind) -> Option<Vec<Finding>> {
    let mut pos = 0;

    while let Some(offset) = raw[pos..].find('{') {
        let start = pos + offset;

        let Some(end) = balanced_end(raw, start) else {
            // unbalanced: a later '{' may still open a complete object
            pos = start + 1;
            continue;
        };

        let candidate = &raw[start..=end];
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(candidate) {
            if let Some(findings) = findings_from_value(&value, kind) {
                return Some(findings);
            }
        }

        // objects nested in a rejected candidate are not candidates themselves
        pos = end + 1;
    }

    None
}

/// Byte index of the `}` closing the object opened at `start`, honouring
/// string literals and escapes.
fn balanced_end(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Findings carried by a parsed response, or `None` when the value has no
/// findings array at all. Elements that fail validation are dropped.
pub fn findings_from_value(value: &Value, kind: AnalysisKind) -> Option<Vec<Finding>> {
    let elements = match value {
        Value::Array(items) => items,
        Value::Object(map) => std::iter::once(kind.preferred_key())
            .chain(FINDING_KEYS)
            .find_map(|key| map.get(key).and_then(Value::as_array))?,
        _ => return None,
    };

    let findings = elements
        .iter()
        .filter_map(|element| match validate_finding(element) {
            Ok(finding) => Some(finding),
            Err(e) => {
                tracing::warn!(error = %e, "dropping invalid finding");
                None
            }
        })
        .collect();

    Some(findings)
}

pub(crate) fn validate_finding(value: &Value) -> Result<Finding, ValidationError> {
    let map = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let severity: Severity = required(map, &["severity"])?.parse()?;
    let mut finding = Finding::new(
        required(map, &["section"])?,
        required(map, &["clause"])?,
        verbatim(map, &["description", "risk_description"])
            .ok_or(ValidationError::MissingField("description"))?,
        severity,
        required(map, &["recommendation"])?,
    );

    if let Some(snippet) = optional(map, &["snippet", "extracted_text_snippet"]) {
        finding = finding.with_snippet(snippet);
    }

    Ok(finding)
}

fn required(map: &Map<String, Value>, names: &[&'static str]) -> Result<String, ValidationError> {
    optional(map, names).ok_or(ValidationError::MissingField(names[0]))
}

fn optional(map: &Map<String, Value>, names: &[&str]) -> Option<String> {
    verbatim(map, names).map(|s| s.trim().to_string())
}

/// First non-blank value among `names`, untrimmed. Descriptions stay as the
/// model wrote them since dedup compares them exactly.
fn verbatim(map: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| map.get(*name).and_then(Value::as_str))
        .find(|s| !s.trim().is_empty())
        .map(String::from)
}
