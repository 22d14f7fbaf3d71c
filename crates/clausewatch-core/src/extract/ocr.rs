use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::Semaphore;

use super::sniffer::StrategyKind;
use super::strategy::{ExtractionError, ExtractionResult, ExtractionStrategy};
use crate::config::OcrConfig;

const RASTERIZER: &str = "pdftoppm";
const RECOGNIZER: &str = "tesseract";
const PAGE_PREFIX: &str = "page";

/// Rasterizes PDF pages with poppler and recognizes them with tesseract.
///
/// Both tools are external processes, so the async runtime never blocks on
/// them; the semaphore bounds how many documents are being OCRed at once.
/// Share one instance (through the owning [`super::TextExtractor`]) across
/// requests for the bound to be process-wide.
pub struct OcrStrategy {
    config: OcrConfig,
    permits: Arc<Semaphore>,
    tools: Option<(PathBuf, PathBuf)>,
}

impl OcrStrategy {
    #[must_use]
    pub fn new(config: OcrConfig) -> Self {
        let tools = if config.enabled {
            which::which(RASTERIZER)
                .ok()
                .zip(which::which(RECOGNIZER).ok())
        } else {
            None
        };

        if config.enabled && tools.is_none() {
            tracing::info!("OCR disabled: {RASTERIZER} or {RECOGNIZER} not found on PATH");
        }

        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            config,
            permits,
            tools,
        }
    }

    async fn rasterize(&self, rasterizer: &Path, pdf: &Path, out_dir: &Path) -> ExtractionResult<Vec<PathBuf>> {
        let output = Command::new(rasterizer)
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(self.config.max_pages.to_string())
            .arg("-png")
            .arg(pdf)
            .arg(out_dir.join(PAGE_PREFIX))
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExtractionError::ToolFailed {
                tool: RASTERIZER.into(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "png") {
                pages.push(path);
            }
        }

        // pdftoppm zero-pads page numbers to a common width, so lexical order is page order
        pages.sort();
        pages.truncate(self.config.max_pages as usize);
        Ok(pages)
    }

    async fn recognize(&self, recognizer: &Path, image: &Path) -> ExtractionResult<String> {
        let output = Command::new(recognizer)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .output()
            .await?;

        if !output.status.success() {
            return Err(ExtractionError::ToolFailed {
                tool: RECOGNIZER.into(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait::async_trait]
impl ExtractionStrategy for OcrStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Ocr
    }

    fn is_available(&self) -> bool {
        self.tools.is_some()
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String> {
        let (rasterizer, recognizer) = self
            .tools
            .as_ref()
            .ok_or_else(|| ExtractionError::ToolMissing(format!("{RASTERIZER}/{RECOGNIZER}")))?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ExtractionError::ToolFailed {
                tool: "ocr pool".into(),
                message: e.to_string(),
            })?;

        let workdir = tempfile::tempdir()?;
        let pdf_path = workdir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, &data[..]).await?;

        let pages = self.rasterize(rasterizer, &pdf_path, workdir.path()).await?;
        tracing::debug!(pages = pages.len(), cap = self.config.max_pages, "rasterized for OCR");

        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            texts.push(self.recognize(recognizer, page).await?);
        }

        Ok(texts.join("\n"))
    }
}
