use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::analysis::{
    attach_snippets, dedup, AnalysisKind, AnalysisOrchestrator, ChunkResult, Chunker, Cl100kCounter,
};
use crate::config::PipelineConfig;
use crate::document::RawDocument;
use crate::error::{Error, Result};
use crate::extract::{ExtractionAttempt, StrategyKind, TextExtractor};
use crate::finding::ConsolidatedReport;
use crate::model::ModelClient;
use crate::storage::{ReportId, ReportMetadata, ReportStore};

pub struct PipelineOutput {
    pub report: ConsolidatedReport,
    /// The extracted document text the report was produced from
    pub text: String,
    pub strategy: StrategyKind,
    pub attempts: Vec<ExtractionAttempt>,
    pub chunk_results: Vec<ChunkResult>,
    pub duration_ms: u64,
}

/// Document in, consolidated report out: extract, chunk, analyse each chunk,
/// merge.
pub struct AnalysisPipeline {
    extractor: Arc<TextExtractor>,
    chunker: Chunker,
    orchestrator: AnalysisOrchestrator,
    locate_snippets: bool,
}

impl AnalysisPipeline {
    /// Default configuration, risk analysis.
    pub fn new(client: Arc<dyn ModelClient>) -> Result<Self> {
        Self::from_config(&PipelineConfig::default(), client, AnalysisKind::Risk)
    }

    pub fn from_config(config: &PipelineConfig, client: Arc<dyn ModelClient>, kind: AnalysisKind) -> Result<Self> {
        config.validate().map_err(Error::Configuration)?;

        let counter = Arc::new(Cl100kCounter::new()?);
        Ok(Self {
            extractor: Arc::new(TextExtractor::from_config(config)),
            chunker: Chunker::from_config(counter, &config.chunking),
            orchestrator: AnalysisOrchestrator::from_config(client, kind, &config.model),
            locate_snippets: true,
        })
    }

    /// Share one extractor (and so one OCR pool) between pipelines.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_orchestrator(mut self, orchestrator: AnalysisOrchestrator) -> Self {
        self.orchestrator = orchestrator;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: AnalysisKind) -> Self {
        self.orchestrator = self.orchestrator.with_kind(kind);
        self
    }

    #[must_use]
    pub const fn with_snippet_location(mut self, enabled: bool) -> Self {
        self.locate_snippets = enabled;
        self
    }

    pub const fn kind(&self) -> AnalysisKind {
        self.orchestrator.kind()
    }

    pub fn extractor(&self) -> &Arc<TextExtractor> {
        &self.extractor
    }

    #[tracing::instrument(skip_all, fields(filename = %document.filename, kind = %self.kind()))]
    pub async fn analyze(&self, document: &RawDocument, cancel: &CancellationToken) -> Result<PipelineOutput> {
        let start = Instant::now();

        let run = self.extractor.extract_traced(document).await;
        let attempted = run.attempted();
        let Some(strategy) = run.text.strategy() else {
            return Err(Error::ExtractionExhausted {
                filename: document.filename.clone(),
                attempted,
            });
        };
        let text = run.text.into_text().unwrap_or_default();

        let (report, chunk_results) = self.analyze_text(&text, cancel).await?;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            findings = report.real_findings().count(),
            chunks = report.chunks_total,
            failed = report.chunks_failed,
            complete = report.complete,
            duration_ms,
            "document analysed"
        );

        Ok(PipelineOutput {
            report,
            text,
            strategy,
            attempts: run.attempts,
            chunk_results,
            duration_ms,
        })
    }

    /// Analyse text that has already been extracted.
    pub async fn analyze_text(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<(ConsolidatedReport, Vec<ChunkResult>)> {
        let chunks = self.chunker.split(text)?;
        if chunks.is_empty() {
            return Err(Error::EmptyDocument);
        }
        tracing::debug!(chunks = chunks.len(), "document chunked");

        let run = self.orchestrator.analyze_chunks(&chunks, cancel).await;

        let mut findings = dedup(run.findings());
        if self.locate_snippets {
            attach_snippets(&mut findings, text);
        }

        let report = ConsolidatedReport::new(self.kind(), findings).with_chunk_counts(
            chunks.len(),
            run.analyzed(),
            run.failed(),
        );

        Ok((report, run.results))
    }

    /// Analyse `document` and persist the report for `owner_id`.
    pub async fn analyze_and_store(
        &self,
        document: &RawDocument,
        owner_id: &str,
        source_document_id: Option<&str>,
        store: &dyn ReportStore,
        cancel: &CancellationToken,
    ) -> Result<(ReportId, PipelineOutput)> {
        let output = self.analyze(document, cancel).await?;

        let mut metadata = ReportMetadata::new(owner_id, &output.text).with_filename(&document.filename);
        if let Some(id) = source_document_id {
            metadata = metadata.with_source_document(id);
        }

        let id = store.save(output.report.clone(), metadata).await?;
        tracing::info!(report_id = %id, "report stored");
        Ok((id, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::WordCounter;
    use crate::model::{CompletionRequest, ModelResult};

    struct Silent;

    #[async_trait::async_trait]
    impl ModelClient for Silent {
        async fn complete(&self, _request: &CompletionRequest) -> ModelResult<String> {
            Ok(r#"{"risks": []}"#.into())
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.chunking.max_tokens = 0;

        let result = AnalysisPipeline::from_config(&config, Arc::new(Silent), AnalysisKind::Risk);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_clean_document_gets_sentinel() {
        let pipeline = AnalysisPipeline::new(Arc::new(Silent))
            .unwrap()
            .with_chunker(Chunker::new(Arc::new(WordCounter), 5, 1));

        let (report, results) = pipeline
            .analyze_text("one two three four five six seven", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert!(report.is_clean());
        assert!(report.complete);
        assert_eq!(report.chunks_total, 2);
        assert_eq!(report.chunks_analyzed, 2);
    }

    #[tokio::test]
    async fn test_blank_text_is_not_reported_clean() {
        let pipeline = AnalysisPipeline::new(Arc::new(Silent)).unwrap();
        let result = pipeline
            .analyze_text(" \n\t  \n", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(Error::EmptyDocument)));
    }

    #[tokio::test]
    async fn test_with_kind_switches_analysis() {
        let pipeline = AnalysisPipeline::new(Arc::new(Silent))
            .unwrap()
            .with_kind(AnalysisKind::Compliance);
        assert_eq!(pipeline.kind(), AnalysisKind::Compliance);

        let (report, _) = pipeline
            .analyze_text("Short contract.", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.kind, AnalysisKind::Compliance);
    }
}
