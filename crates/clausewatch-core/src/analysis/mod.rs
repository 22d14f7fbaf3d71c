mod chunker;
mod dedup;
mod orchestrator;
mod prompt;
mod salvage;
mod snippet;
mod tokens;

pub use chunker::{Chunk, ChunkError, Chunker};
pub use dedup::{dedup, DedupKey};
pub use orchestrator::{AnalysisOrchestrator, ChunkOutcome, ChunkResult, OrchestratorRun};
pub use prompt::AnalysisKind;
pub use salvage::{findings_from_value, parse_findings, salvage_findings, ParsedFindings, ValidationError};
pub use snippet::{attach_snippets, locate_snippet};
pub use tokens::{Cl100kCounter, TokenCounter, WordCounter};
