use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::chunker::Chunk;

const FINDING_SCHEMA: &str = r#"{ "section": "...", "clause": "...", "description": "...", "severity": "Low|Medium|High", "recommendation": "...", "snippet": "..." }"#;

/// Which review a pipeline run performs. Both share the whole pipeline and
/// the finding schema; they differ in instruction, response key and
/// sampling temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    #[default]
    Risk,
    Compliance,
}

impl AnalysisKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Risk => "risk",
            Self::Compliance => "compliance",
        }
    }

    /// Top-level key the model is told to put its findings under.
    pub const fn preferred_key(&self) -> &'static str {
        match self {
            Self::Risk => "risks",
            Self::Compliance => "issues",
        }
    }

    pub const fn default_temperature(&self) -> f32 {
        match self {
            Self::Risk => 0.3,
            Self::Compliance => 0.0,
        }
    }

    pub fn system_instruction(&self) -> String {
        let task = match self {
            Self::Risk => {
                "You are a legal analysis assistant. Identify clauses in the contract text that \
                 expose a party to legal, financial or operational risk."
            }
            Self::Compliance => {
                "You are a contract compliance assistant. Identify only clauses that directly \
                 violate applicable data-protection or contract-law requirements."
            }
        };

        format!(
            "{task}\n\
             Return valid JSON only, in the format:\n\
             {{ \"{key}\": [ {FINDING_SCHEMA} ] }}\n\
             \"snippet\" is optional and should quote the clause text verbatim. \
             If nothing qualifies return {{ \"{key}\": [] }}.",
            key = self.preferred_key(),
        )
    }

    /// User prompt for one chunk. Positions are shown one-based.
    pub fn chunk_prompt(&self, chunk: &Chunk) -> String {
        format!(
            "This is chunk {} of {} of a larger document. Report only what appears in this chunk; \
             other chunks are reviewed separately.\n\nDocument:\n{}",
            chunk.index + 1,
            chunk.total,
            chunk.text
        )
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "risk" | "risks" => Ok(Self::Risk),
            "compliance" | "issues" => Ok(Self::Compliance),
            other => Err(format!("unknown analysis kind: {other}")),
        }
    }
}
