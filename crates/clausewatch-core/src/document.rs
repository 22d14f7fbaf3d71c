use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extract::StrategyKind;

/// An uploaded document as received: the bytes and the name the client gave it.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl RawDocument {
    #[must_use]
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(String::from)
            .unwrap_or_default();
        Ok(Self { bytes, filename })
    }

    /// Lower-cased extension of the filename, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractedText {
    Succeeded { text: String, strategy: StrategyKind },
    Failed,
}

impl ExtractedText {
    #[must_use]
    pub fn succeeded(text: String, strategy: StrategyKind) -> Self {
        Self::Succeeded { text, strategy }
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Succeeded { text, .. } => Some(text),
            Self::Failed => None,
        }
    }

    pub const fn strategy(&self) -> Option<StrategyKind> {
        match self {
            Self::Succeeded { strategy, .. } => Some(*strategy),
            Self::Failed => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Succeeded { text, .. } => Some(text),
            Self::Failed => None,
        }
    }
}
