use std::sync::Arc;

use super::quality::QualityGate;
use super::sniffer::StrategyKind;
use super::strategy::{ExtractionResult, ExtractionStrategy};

/// Last-resort decode of the bytes as text.
///
/// UTF-8 first, dropping invalid sequences; if that does not pass the gate,
/// Latin-1, which maps every byte to a character and so always yields
/// something. The driver still gates whatever comes back.
#[derive(Debug, Default)]
pub struct RawDecodeStrategy {
    gate: QualityGate,
}

impl RawDecodeStrategy {
    #[must_use]
    pub const fn new(gate: QualityGate) -> Self {
        Self { gate }
    }
}

pub(crate) fn decode_utf8_ignoring_invalid(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => String::from_utf8_lossy(data)
            .chars()
            .filter(|c| *c != char::REPLACEMENT_CHARACTER)
            .collect(),
    }
}

pub(crate) fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| char::from(b)).collect()
}

#[async_trait::async_trait]
impl ExtractionStrategy for RawDecodeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RawDecode
    }

    async fn try_extract(&self, data: Arc<[u8]>) -> ExtractionResult<String> {
        let utf8 = decode_utf8_ignoring_invalid(&data);
        if self.gate.accepts(&utf8, self.kind().allows_short_text()) {
            return Ok(utf8);
        }

        tracing::debug!("UTF-8 decode rejected, falling back to Latin-1");
        Ok(decode_latin1(&data))
    }
}
