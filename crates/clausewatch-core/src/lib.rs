#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod finding;
pub mod model;
pub mod pipeline;
pub mod storage;

pub use analysis::{
    AnalysisKind, AnalysisOrchestrator, Chunk, ChunkError, Chunker, ChunkOutcome, ChunkResult,
    Cl100kCounter, TokenCounter, WordCounter,
};
pub use config::{ChunkConfig, ModelConfig, OcrConfig, PipelineConfig, QualityConfig};
pub use document::{ExtractedText, RawDocument};
pub use error::{Error, Result};
pub use extract::{
    ExtractionError, ExtractionStrategy, QualityGate, StrategyKind, TextExtractor,
};
pub use finding::{ConsolidatedReport, Finding, Severity};
pub use model::{CompletionRequest, ModelClient, ModelError, OpenAiClient, RetryPolicy};
pub use pipeline::{AnalysisPipeline, PipelineOutput};
pub use storage::{MemoryReportStore, ReportId, ReportMetadata, ReportStore, StoreError, StoredReport};
