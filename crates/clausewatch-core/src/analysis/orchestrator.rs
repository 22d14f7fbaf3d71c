use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::chunker::Chunk;
use super::prompt::AnalysisKind;
use super::salvage::{parse_findings, ParsedFindings};
use crate::config::ModelConfig;
use crate::finding::Finding;
use crate::model::{CompletionRequest, ModelClient, RetryPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkOutcome {
    Clean,
    Salvaged,
    /// The model answered with no content
    Empty,
    /// A response arrived but held no findings array
    Unparseable,
    /// The call itself failed after retries
    Failed,
}

impl ChunkOutcome {
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Unparseable | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkResult {
    pub findings: Vec<Finding>,
    pub chunk_index: usize,
    pub outcome: ChunkOutcome,
}

/// Per-chunk results of one pass over a document, in chunk order.
#[derive(Debug, Clone, Default)]
pub struct OrchestratorRun {
    pub results: Vec<ChunkResult>,
    /// Stopped before the last chunk because cancellation was requested
    pub cancelled: bool,
}

impl OrchestratorRun {
    pub fn analyzed(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_failure()).count()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.results
            .iter()
            .flat_map(|r| r.findings.iter().cloned())
            .collect()
    }
}

/// Sends each chunk to the model in turn and collects the findings.
///
/// A chunk whose call fails contributes nothing; the remaining chunks are
/// still analysed.
pub struct AnalysisOrchestrator {
    client: Arc<dyn ModelClient>,
    kind: AnalysisKind,
    retry: RetryPolicy,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl AnalysisOrchestrator {
    #[must_use]
    pub fn new(client: Arc<dyn ModelClient>, kind: AnalysisKind) -> Self {
        Self::from_config(client, kind, &ModelConfig::default())
    }

    #[must_use]
    pub fn from_config(client: Arc<dyn ModelClient>, kind: AnalysisKind, config: &ModelConfig) -> Self {
        Self {
            client,
            kind,
            retry: RetryPolicy::from_config(config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: AnalysisKind) -> Self {
        self.kind = kind;
        self
    }

    pub const fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub fn request_for(&self, chunk: &Chunk) -> CompletionRequest {
        CompletionRequest {
            prompt: self.kind.chunk_prompt(chunk),
            system_message: self.kind.system_instruction(),
            model: self.model.clone(),
            temperature: Some(self.temperature.unwrap_or_else(|| self.kind.default_temperature())),
            max_output_tokens: self.max_output_tokens,
            json_response: true,
        }
    }

    #[tracing::instrument(skip_all, fields(chunk = chunk.index + 1, total = chunk.total, kind = %self.kind))]
    pub async fn analyze_chunk(&self, chunk: &Chunk) -> ChunkResult {
        let request = self.request_for(chunk);
        let (client, request) = (&self.client, &request);

        let (findings, outcome) = match self.retry.run(move || client.complete(request)).await {
            Ok(raw) if raw.trim().is_empty() => {
                tracing::info!("model returned no content");
                (Vec::new(), ChunkOutcome::Empty)
            }
            Ok(raw) => match parse_findings(&raw, self.kind) {
                ParsedFindings::Clean(findings) => (findings, ChunkOutcome::Clean),
                ParsedFindings::Salvaged(findings) => (findings, ChunkOutcome::Salvaged),
                ParsedFindings::Unparseable => {
                    tracing::warn!(response_chars = raw.len(), "no findings could be parsed from response");
                    (Vec::new(), ChunkOutcome::Unparseable)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "chunk analysis failed");
                (Vec::new(), ChunkOutcome::Failed)
            }
        };

        tracing::debug!(findings = findings.len(), ?outcome, "chunk analysed");
        ChunkResult {
            findings,
            chunk_index: chunk.index,
            outcome,
        }
    }

    /// Analyse `chunks` in order. Cancellation is checked before each chunk;
    /// a call already in flight is allowed to finish.
    pub async fn analyze_chunks(&self, chunks: &[Chunk], cancel: &CancellationToken) -> OrchestratorRun {
        let mut run = OrchestratorRun::default();

        for chunk in chunks {
            if cancel.is_cancelled() {
                tracing::info!(
                    analyzed = run.analyzed(),
                    total = chunks.len(),
                    "analysis cancelled, keeping partial results"
                );
                run.cancelled = true;
                break;
            }

            run.results.push(self.analyze_chunk(chunk).await);
        }

        run
    }
}
