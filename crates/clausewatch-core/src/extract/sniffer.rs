use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Paragraph text from an Office Open XML container
    StructuredDocument,
    /// Fast text-layer read, page by page
    PdfPrimary,
    /// Layout-aware re-parse for malformed or sparse PDFs
    PdfSecondary,
    /// Rasterize pages and recognize characters
    Ocr,
    /// Decode the bytes as text
    RawDecode,
}

impl StrategyKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StructuredDocument => "structured_document",
            Self::PdfPrimary => "pdf_primary",
            Self::PdfSecondary => "pdf_secondary",
            Self::Ocr => "ocr",
            Self::RawDecode => "raw_decode",
        }
    }

    /// Whether text shorter than the quality minimum is still acceptable.
    /// Word documents, OCR output and plain text are often legitimately short.
    #[must_use]
    pub const fn allows_short_text(&self) -> bool {
        matches!(self, Self::StructuredDocument | Self::Ocr | Self::RawDecode)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const WORD_EXTENSIONS: &[&str] = &["docx", "docm", "dotx", "dotm"];

/// Ordered extraction strategies for a filename. Never empty.
pub fn strategies_for(filename: &str) -> Vec<StrategyKind> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        e if WORD_EXTENSIONS.contains(&e) => {
            vec![StrategyKind::StructuredDocument, StrategyKind::RawDecode]
        }
        "pdf" => vec![
            StrategyKind::PdfPrimary,
            StrategyKind::PdfSecondary,
            StrategyKind::Ocr,
            StrategyKind::RawDecode,
        ],
        _ => vec![StrategyKind::RawDecode],
    }
}
