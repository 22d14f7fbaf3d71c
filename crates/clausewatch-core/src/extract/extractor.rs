use std::sync::Arc;

use serde::Serialize;

use super::docx::DocxStrategy;
use super::ocr::OcrStrategy;
use super::pdf::{PdfLayoutStrategy, PdfTextLayerStrategy};
use super::quality::QualityGate;
use super::raw::RawDecodeStrategy;
use super::sniffer::{strategies_for, StrategyKind};
use super::strategy::ExtractionStrategy;
use crate::config::PipelineConfig;
use crate::document::{ExtractedText, RawDocument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted { chars: usize },
    /// Produced text the quality gate turned down
    Rejected { chars: usize },
    Failed { error: String },
    /// No strategy registered for the kind, or its runtime capability is missing
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionAttempt {
    pub kind: StrategyKind,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// The extracted text plus a record of every strategy consulted for it.
#[derive(Debug, Clone)]
pub struct ExtractionRun {
    pub text: ExtractedText,
    pub attempts: Vec<ExtractionAttempt>,
}

impl ExtractionRun {
    /// Strategies that actually ran (skipped ones excluded).
    pub fn attempted(&self) -> Vec<StrategyKind> {
        self.attempts
            .iter()
            .filter(|a| a.outcome != AttemptOutcome::Skipped)
            .map(|a| a.kind)
            .collect()
    }
}

/// Drives the ordered strategy chain for a document until one produces text
/// the quality gate accepts.
pub struct TextExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    gate: QualityGate,
}

impl TextExtractor {
    #[must_use]
    pub fn new(gate: QualityGate) -> Self {
        Self {
            strategies: Vec::new(),
            gate,
        }
    }

    /// Every built-in strategy, configured from `config`.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let gate = QualityGate::from_config(&config.quality);

        Self::new(gate)
            .with_strategy(Box::new(DocxStrategy::new()))
            .with_strategy(Box::new(PdfTextLayerStrategy::new()))
            .with_strategy(Box::new(PdfLayoutStrategy::new()))
            .with_strategy(Box::new(OcrStrategy::new(config.ocr.clone())))
            .with_strategy(Box::new(RawDecodeStrategy::new(gate)))
    }

    /// Register a strategy, replacing any existing one of the same kind.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.add_strategy(strategy);
        self
    }

    pub fn add_strategy(&mut self, strategy: Box<dyn ExtractionStrategy>) {
        let kind = strategy.kind();
        self.strategies.retain(|s| s.kind() != kind);
        self.strategies.push(strategy);
    }

    pub const fn gate(&self) -> &QualityGate {
        &self.gate
    }

    fn find_strategy(&self, kind: StrategyKind) -> Option<&dyn ExtractionStrategy> {
        self.strategies
            .iter()
            .find(|s| s.kind() == kind)
            .map(|s| s.as_ref())
    }

    pub async fn extract(&self, document: &RawDocument) -> ExtractedText {
        self.extract_traced(document).await.text
    }

    #[tracing::instrument(skip(self, document), fields(filename = %document.filename, bytes = document.len()))]
    pub async fn extract_traced(&self, document: &RawDocument) -> ExtractionRun {
        let data: Arc<[u8]> = Arc::from(document.bytes.as_slice());
        let mut attempts = Vec::new();

        for kind in strategies_for(&document.filename) {
            let Some(strategy) = self.find_strategy(kind).filter(|s| s.is_available()) else {
                tracing::debug!(strategy = %kind, "strategy unavailable, skipping");
                attempts.push(ExtractionAttempt {
                    kind,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            };

            match strategy.try_extract(Arc::clone(&data)).await {
                Ok(text) => {
                    let chars = text.chars().count();
                    if self.gate.accepts(&text, kind.allows_short_text()) {
                        tracing::info!(strategy = %kind, chars, "text extracted");
                        attempts.push(ExtractionAttempt {
                            kind,
                            outcome: AttemptOutcome::Accepted { chars },
                        });
                        return ExtractionRun {
                            text: ExtractedText::succeeded(text, kind),
                            attempts,
                        };
                    }

                    tracing::debug!(strategy = %kind, chars, "quality gate rejected text");
                    attempts.push(ExtractionAttempt {
                        kind,
                        outcome: AttemptOutcome::Rejected { chars },
                    });
                }
                Err(e) => {
                    tracing::debug!(strategy = %kind, error = %e, "strategy failed");
                    attempts.push(ExtractionAttempt {
                        kind,
                        outcome: AttemptOutcome::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        tracing::warn!("all extraction strategies failed");
        ExtractionRun {
            text: ExtractedText::Failed,
            attempts,
        }
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::strategy::{ExtractionError, ExtractionResult};

    struct Fixed {
        kind: StrategyKind,
        output: Result<&'static str, &'static str>,
    }

    #[async_trait::async_trait]
    impl ExtractionStrategy for Fixed {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn try_extract(&self, _data: Arc<[u8]>) -> ExtractionResult<String> {
            self.output
                .map(String::from)
                .map_err(|e| ExtractionError::Parse(e.into()))
        }
    }

    fn fixed(kind: StrategyKind, output: Result<&'static str, &'static str>) -> Box<Fixed> {
        Box::new(Fixed { kind, output })
    }

    const LONG: &str = "This agreement is made between the landlord and the tenant and sets out the terms of the tenancy in full.";

    #[tokio::test]
    async fn test_first_accepted_strategy_wins() {
        let extractor = TextExtractor::new(QualityGate::default())
            .with_strategy(fixed(StrategyKind::PdfPrimary, Err("broken xref")))
            .with_strategy(fixed(StrategyKind::PdfSecondary, Ok(LONG)))
            .with_strategy(fixed(StrategyKind::RawDecode, Ok("should not be reached")));

        let run = extractor
            .extract_traced(&RawDocument::new(b"%PDF".to_vec(), "lease.pdf"))
            .await;

        assert_eq!(run.text, ExtractedText::succeeded(LONG.into(), StrategyKind::PdfSecondary));
        assert_eq!(
            run.attempted(),
            vec![StrategyKind::PdfPrimary, StrategyKind::PdfSecondary]
        );
    }

    #[tokio::test]
    async fn test_short_pdf_text_rejected_but_raw_accepts_short() {
        let extractor = TextExtractor::new(QualityGate::default())
            .with_strategy(fixed(StrategyKind::PdfPrimary, Ok("Page 1")))
            .with_strategy(fixed(StrategyKind::RawDecode, Ok("Short but fine.")));

        let run = extractor
            .extract_traced(&RawDocument::new(Vec::new(), "scan.pdf"))
            .await;

        assert_eq!(run.text.strategy(), Some(StrategyKind::RawDecode));
        assert_eq!(
            run.attempts[0].outcome,
            AttemptOutcome::Rejected { chars: 6 }
        );
        // PdfSecondary and Ocr are not registered
        assert_eq!(run.attempts[1].outcome, AttemptOutcome::Skipped);
        assert_eq!(run.attempts[2].outcome, AttemptOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_all_strategies_fail() {
        let extractor = TextExtractor::new(QualityGate::default())
            .with_strategy(fixed(StrategyKind::RawDecode, Ok("\0\0\0\0")));

        let run = extractor
            .extract_traced(&RawDocument::new(vec![0; 4], "blob.bin"))
            .await;

        assert_eq!(run.text, ExtractedText::Failed);
        assert_eq!(run.attempted(), vec![StrategyKind::RawDecode]);
    }

    #[tokio::test]
    async fn test_with_strategy_replaces_same_kind() {
        let extractor = TextExtractor::new(QualityGate::default())
            .with_strategy(fixed(StrategyKind::RawDecode, Err("first")))
            .with_strategy(fixed(StrategyKind::RawDecode, Ok("second")));

        let text = extractor
            .extract(&RawDocument::new(Vec::new(), "notes.txt"))
            .await;
        assert_eq!(text.text(), Some("second"));
    }

    #[tokio::test]
    async fn test_default_chain_reads_docx() {
        let bytes = crate::extract::docx::tests::build_docx(
            r#"<w:document xmlns:w="w"><w:body><w:p><w:r><w:t>Short NDA.</w:t></w:r></w:p></w:body></w:document>"#,
        );

        let text = TextExtractor::default()
            .extract(&RawDocument::new(bytes, "nda.docx"))
            .await;

        assert_eq!(text, ExtractedText::succeeded("Short NDA.".into(), StrategyKind::StructuredDocument));
    }

    #[tokio::test]
    async fn test_default_chain_rejects_control_bytes() {
        let blob: Vec<u8> = (0u8..32).chain(0x80..0xa0).cycle().take(4096).collect();

        let run = TextExtractor::default()
            .extract_traced(&RawDocument::new(blob, "mystery.xyz"))
            .await;

        assert_eq!(run.text, ExtractedText::Failed);
        assert_eq!(
            run.attempts[0].outcome,
            AttemptOutcome::Rejected { chars: 4096 }
        );
    }

    #[tokio::test]
    async fn test_plain_text_file() {
        let run = TextExtractor::default()
            .extract_traced(&RawDocument::new(LONG.as_bytes().to_vec(), "contract.txt"))
            .await;
        assert_eq!(run.text.text(), Some(LONG));
    }
}
