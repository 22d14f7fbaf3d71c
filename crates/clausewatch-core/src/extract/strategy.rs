use std::sync::Arc;

use thiserror::Error;

use super::sniffer::StrategyKind;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported input: {0}")]
    Unsupported(String),
    #[error("Parse failed: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Required tool not found: {0}")]
    ToolMissing(String),
    #[error("{tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
    #[error("Extraction task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// One way of turning document bytes into text.
///
/// Implementations only produce candidates; deciding whether a candidate is
/// good enough belongs to the [`super::TextExtractor`] driving the chain.
#[async_trait::async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// False when a runtime capability the strategy depends on is missing.
    fn is_available(&self) -> bool {
        true
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String>;
}
