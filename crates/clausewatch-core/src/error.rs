use thiserror::Error;

use crate::analysis::ChunkError;
use crate::extract::StrategyKind;
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No extraction strategy produced usable text for {filename} (tried: {attempted:?})")]
    ExtractionExhausted {
        filename: String,
        attempted: Vec<StrategyKind>,
    },

    #[error("Document contains no text to analyse")]
    EmptyDocument,

    #[error("Chunking failed: {0}")]
    Chunking(#[from] ChunkError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// True when the input itself is unusable and retrying the same bytes cannot help.
    pub const fn is_unprocessable(&self) -> bool {
        matches!(self, Self::ExtractionExhausted { .. } | Self::EmptyDocument)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
