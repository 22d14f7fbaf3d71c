mod docx;
mod extractor;
mod ocr;
mod pdf;
mod quality;
mod raw;
mod sniffer;
mod strategy;

pub use docx::DocxStrategy;
pub use extractor::{AttemptOutcome, ExtractionAttempt, ExtractionRun, TextExtractor};
pub use ocr::OcrStrategy;
pub use pdf::{reflow, LayoutMargins, PdfLayoutStrategy, PdfTextLayerStrategy};
pub use quality::QualityGate;
pub use raw::RawDecodeStrategy;
pub use sniffer::{strategies_for, StrategyKind};
pub use strategy::{ExtractionError, ExtractionResult, ExtractionStrategy};
