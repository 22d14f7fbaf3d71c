use crate::config::QualityConfig;

/// Heuristic acceptance test for extracted text.
///
/// Binary misparses and failed OCR tend to produce mostly control characters,
/// so the printable ratio catches those; the length floor catches parsers that
/// returned a few stray glyphs. Callers that know their source is legitimately
/// short pass `allow_short`.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate {
    min_printable_ratio: f64,
    min_chars: usize,
}

impl QualityGate {
    #[must_use]
    pub const fn new(min_printable_ratio: f64, min_chars: usize) -> Self {
        Self {
            min_printable_ratio,
            min_chars,
        }
    }

    #[must_use]
    pub const fn from_config(config: &QualityConfig) -> Self {
        Self::new(config.min_printable_ratio, config.min_chars)
    }

    /// Text with no visible characters is always rejected.
    pub fn accepts(&self, text: &str, allow_short: bool) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        let (len, printable) = text.chars().fold((0usize, 0usize), |(len, printable), c| {
            (len + 1, printable + usize::from(is_printable(c)))
        });
        let ratio = printable as f64 / len.max(1) as f64;

        ratio >= self.min_printable_ratio && (len > self.min_chars || allow_short)
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}

fn is_printable(c: char) -> bool {
    !c.is_control() && c != char::REPLACEMENT_CHARACTER
}
