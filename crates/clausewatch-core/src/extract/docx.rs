use std::io::{Cursor, Read};
use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::ZipArchive;

use super::sniffer::StrategyKind;
use super::strategy::{ExtractionError, ExtractionResult, ExtractionStrategy};

const DOCUMENT_PART: &str = "word/document.xml";

/// Paragraph text from a Word (OOXML) container, one paragraph per line.
#[derive(Debug, Default)]
pub struct DocxStrategy;

impl DocxStrategy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn read_document_part(data: &[u8]) -> ExtractionResult<String> {
        let mut archive = ZipArchive::new(Cursor::new(data))
            .map_err(|e| ExtractionError::Unsupported(format!("not a zip container: {e}")))?;

        let mut part = archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| ExtractionError::Unsupported(format!("missing {DOCUMENT_PART}: {e}")))?;

        let mut xml = String::new();
        part.read_to_string(&mut xml)?;
        Ok(xml)
    }
}

/// Collect the text of every `w:p` element, joined with newlines.
///
/// `w:tab` and `w:br` only count inside a run; under `w:pPr` a `w:tab` is a
/// tab-stop definition, not content.
pub(crate) fn paragraphs_from_xml(xml: &str) -> ExtractionResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_paragraph = false;
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    current.clear();
                }
                b"r" => run_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = false;
                    run_depth = 0;
                    paragraphs.push(std::mem::take(&mut current));
                }
                b"r" => run_depth = run_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" if in_paragraph && run_depth > 0 => current.push('\t'),
                b"br" | b"cr" if in_paragraph && run_depth > 0 => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text {
                    let text = e
                        .unescape()
                        .map_err(|err| ExtractionError::Parse(format!("bad XML text: {err}")))?;
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractionError::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

#[async_trait::async_trait]
impl ExtractionStrategy for DocxStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StructuredDocument
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String> {
        tokio::task::spawn_blocking(move || {
            let xml = Self::read_document_part(&data)?;
            let paragraphs = paragraphs_from_xml(&xml)?;
            Ok(paragraphs.join("\n"))
        })
        .await?
    }
}
