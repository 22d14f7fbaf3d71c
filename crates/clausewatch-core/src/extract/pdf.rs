use std::sync::Arc;

use lopdf::Document;

use super::sniffer::StrategyKind;
use super::strategy::{ExtractionError, ExtractionResult, ExtractionStrategy};

const PAGE_SEPARATOR: &str = "\n\n";

/// Reads the PDF text layer page by page.
///
/// Page boundaries are kept as blank lines because downstream chunking and the
/// model both use them as section breaks.
#[derive(Debug, Default)]
pub struct PdfTextLayerStrategy;

impl PdfTextLayerStrategy {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn extract_pages(data: &[u8]) -> ExtractionResult<Vec<String>> {
        let doc = Document::load_mem(data)
            .map_err(|e| ExtractionError::Parse(format!("failed to parse PDF: {e}")))?;

        if doc.is_encrypted() {
            return Err(ExtractionError::Unsupported("encrypted PDF".into()));
        }

        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for page_number in pages.keys() {
            match doc.extract_text(&[*page_number]) {
                Ok(text) => texts.push(text.trim_end().to_string()),
                Err(e) => {
                    tracing::debug!(page = page_number, error = %e, "skipping unreadable page");
                }
            }
        }

        Ok(texts)
    }
}

#[async_trait::async_trait]
impl ExtractionStrategy for PdfTextLayerStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PdfPrimary
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String> {
        let pages = tokio::task::spawn_blocking(move || Self::extract_pages(&data)).await??;
        tracing::debug!(page_count = pages.len(), "PDF text layer read");
        Ok(pages.join(PAGE_SEPARATOR))
    }
}

/// Tolerances applied when reflowing layout-parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMargins {
    /// Runs of more than this many spaces are column gaps and collapse to one space
    pub char_margin: usize,
    /// At most this many consecutive blank lines survive
    pub line_margin: usize,
}

impl Default for LayoutMargins {
    fn default() -> Self {
        Self {
            char_margin: 2,
            line_margin: 1,
        }
    }
}

/// Layout-aware re-parse for documents whose text layer comes back thin.
#[derive(Debug, Default)]
pub struct PdfLayoutStrategy {
    margins: LayoutMargins,
}

impl PdfLayoutStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_margins(mut self, margins: LayoutMargins) -> Self {
        self.margins = margins;
        self
    }
}

#[async_trait::async_trait]
impl ExtractionStrategy for PdfLayoutStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PdfSecondary
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String> {
        let margins = self.margins;
        tokio::task::spawn_blocking(move || {
            let text = pdf_extract::extract_text_from_mem(&data)
                .map_err(|e| ExtractionError::Parse(format!("layout parse failed: {e}")))?;
            Ok(reflow(&text, margins))
        })
        .await?
    }
}

/// Normalize layout-parser output: collapse wide space runs, strip trailing
/// whitespace, and cap consecutive blank lines.
pub fn reflow(text: &str, margins: LayoutMargins) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = collapse_spaces(line.trim_end(), margins.char_margin);

        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > margins.line_margin {
                continue;
            }
            out.push('\n');
            continue;
        }

        blank_run = 0;
        out.push_str(&line);
        out.push('\n');
    }

    out.trim().to_string()
}

fn collapse_spaces(line: &str, char_margin: usize) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pending = 0usize;

    for c in line.chars() {
        if c == ' ' {
            pending += 1;
            continue;
        }
        if pending > 0 {
            let keep = if pending > char_margin { 1 } else { pending };
            out.extend(std::iter::repeat(' ').take(keep));
            pending = 0;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Dictionary, Object, Stream, StringFormat};

    /// A PDF with one line of Helvetica text per page.
    fn text_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![("F1", Object::Reference(font_id))])),
        )]));

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Resources", Object::Reference(resources_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]));
            kids.push(Object::Reference(page_id));
        }

        let count = i64::try_from(kids.len()).unwrap();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(count)),
                ("Kids", Object::Array(kids)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_text_layer_joins_pages_with_blank_line() {
        let pdf = text_pdf(&["The Tenant shall pay rent.", "The Landlord shall repair."]);
        let text = PdfTextLayerStrategy::new()
            .try_extract(pdf.into())
            .await
            .unwrap();
        assert_eq!(text, "The Tenant shall pay rent.\n\nThe Landlord shall repair.");
    }

    #[tokio::test]
    async fn test_layout_parser_reads_every_page() {
        let pdf = text_pdf(&["Governing law", "Termination"]);
        let text = PdfLayoutStrategy::new()
            .try_extract(pdf.into())
            .await
            .unwrap();

        let first = text.find("Governing law").unwrap();
        let second = text.find("Termination").unwrap();
        assert!(first < second);
        // reflowed: no trailing whitespace and never more than one blank line
        assert_eq!(text, text.trim());
        assert!(!text.contains("\n\n\n"));
    }

    #[test]
    fn test_reflow_collapses_column_gaps() {
        let text = "Clause 1          Payment terms\nnet  thirty days";
        assert_eq!(
            reflow(text, LayoutMargins::default()),
            "Clause 1 Payment terms\nnet  thirty days"
        );
    }

    #[test]
    fn test_reflow_caps_blank_lines() {
        let text = "first\n\n\n\n\nsecond\n   \nthird\n";
        assert_eq!(reflow(text, LayoutMargins::default()), "first\n\nsecond\n\nthird");

        let wide = LayoutMargins {
            char_margin: 2,
            line_margin: 2,
        };
        assert_eq!(reflow("a\n\n\n\nb", wide), "a\n\n\nb");
    }

    #[test]
    fn test_reflow_zero_margins() {
        let tight = LayoutMargins {
            char_margin: 0,
            line_margin: 0,
        };
        assert_eq!(reflow("a  b\n\nc", tight), "a b\nc");
    }

    #[tokio::test]
    async fn test_text_layer_rejects_garbage() {
        let result = PdfTextLayerStrategy::new()
            .try_extract(b"definitely not a pdf".to_vec().into())
            .await;
        assert!(matches!(result, Err(ExtractionError::Parse(_))));
    }

    #[tokio::test]
    async fn test_layout_parser_failure_is_contained() {
        let result = PdfLayoutStrategy::new()
            .try_extract(b"%PDF-1.4 truncated".to_vec().into())
            .await;
        assert!(result.is_err());
    }
}
