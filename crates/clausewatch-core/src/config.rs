use serde::{Deserialize, Serialize};
use std::str::FromStr;

const ENV_PREFIX: &str = "CLAUSEWATCH_";

/// Acceptance thresholds for extracted text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Below this share of printable characters the text is treated as binary garbage
    pub min_printable_ratio: f64,
    /// Text must be strictly longer than this unless the strategy allows short text
    pub min_chars: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_printable_ratio: 0.05,
            min_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_tokens: 3000,
            overlap_tokens: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    pub enabled: bool,
    /// Hard cap on rasterized pages per document
    pub max_pages: u32,
    pub dpi: u32,
    /// Tesseract language code
    pub language: String,
    /// OCR jobs allowed to run at once across all requests
    pub max_concurrent: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_pages: 50,
            dpi: 300,
            language: "eng".to_string(),
            max_concurrent: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub api_base: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    /// Overrides the per-analysis default temperature
    pub temperature: Option<f32>,
    /// None selects the documented cap for the model
    pub max_output_tokens: Option<u32>,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: None,
            max_output_tokens: None,
            timeout_seconds: 120,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub quality: QualityConfig,
    #[serde(default)]
    pub chunking: ChunkConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

impl PipelineConfig {
    /// Defaults overlaid with `CLAUSEWATCH_*` environment variables.
    /// `OPENAI_API_KEY` is honoured when `CLAUSEWATCH_API_KEY` is unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut config = Self::default();

        parse_into(&var, "MIN_PRINTABLE_RATIO", &mut config.quality.min_printable_ratio);
        parse_into(&var, "MIN_CHARS", &mut config.quality.min_chars);

        parse_into(&var, "CHUNK_MAX_TOKENS", &mut config.chunking.max_tokens);
        parse_into(&var, "CHUNK_OVERLAP_TOKENS", &mut config.chunking.overlap_tokens);

        if let Some(v) = var("OCR_ENABLED") {
            config.ocr.enabled = v == "1" || v.eq_ignore_ascii_case("true");
        }
        parse_into(&var, "OCR_MAX_PAGES", &mut config.ocr.max_pages);
        parse_into(&var, "OCR_DPI", &mut config.ocr.dpi);
        parse_into(&var, "OCR_MAX_CONCURRENT", &mut config.ocr.max_concurrent);
        if let Some(lang) = var("OCR_LANGUAGE") {
            config.ocr.language = lang;
        }

        if let Some(base) = var("API_BASE") {
            config.model.api_base = base;
        }
        config.model.api_key = var("API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        if let Some(model) = var("MODEL") {
            config.model.model = model;
        }
        if let Some(raw) = var("TEMPERATURE") {
            config.model.temperature = parse_or_warn("TEMPERATURE", &raw);
        }
        if let Some(raw) = var("MAX_OUTPUT_TOKENS") {
            config.model.max_output_tokens = parse_or_warn("MAX_OUTPUT_TOKENS", &raw);
        }
        parse_into(&var, "TIMEOUT_SECONDS", &mut config.model.timeout_seconds);
        parse_into(&var, "MAX_RETRIES", &mut config.model.max_retries);
        parse_into(&var, "RETRY_BASE_DELAY_MS", &mut config.model.retry_base_delay_ms);

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunking.max_tokens == 0 {
            return Err("chunk max_tokens must be greater than zero".into());
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err("chunk overlap_tokens must be smaller than max_tokens".into());
        }
        if !(0.0..=1.0).contains(&self.quality.min_printable_ratio) {
            return Err(format!(
                "min_printable_ratio must be within 0..=1, got {}",
                self.quality.min_printable_ratio
            ));
        }
        if self.ocr.max_concurrent == 0 {
            return Err("ocr max_concurrent must be greater than zero".into());
        }
        // pdftoppm reads `-l 0` as "no last page"
        if self.ocr.max_pages == 0 {
            return Err("ocr max_pages must be greater than zero".into());
        }
        if self.ocr.dpi == 0 {
            return Err("ocr dpi must be greater than zero".into());
        }
        if self.model.timeout_seconds == 0 {
            return Err("model timeout_seconds must be greater than zero".into());
        }
        Ok(())
    }
}

fn parse_into<T: FromStr>(var: &impl Fn(&str) -> Option<String>, name: &str, slot: &mut T) {
    if let Some(parsed) = var(name).and_then(|raw| parse_or_warn(name, &raw)) {
        *slot = parsed;
    }
}

fn parse_or_warn<T: FromStr>(name: &str, raw: &str) -> Option<T> {
    raw.trim().parse().map_or_else(
        |_| {
            tracing::warn!(variable = %format!("{ENV_PREFIX}{name}"), value = raw, "ignoring invalid value");
            None
        },
        Some,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!((config.quality.min_printable_ratio - 0.05).abs() < f64::EPSILON);
        assert_eq!(config.quality.min_chars, 100);
        assert_eq!(config.ocr.max_pages, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("CLAUSEWATCH_CHUNK_MAX_TOKENS", "512"),
            ("CLAUSEWATCH_OCR_ENABLED", "false"),
            ("CLAUSEWATCH_MODEL", "o4-mini"),
            ("CLAUSEWATCH_TEMPERATURE", "0.1"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));

        assert_eq!(config.chunking.max_tokens, 512);
        assert!(!config.ocr.enabled);
        assert_eq!(config.model.model, "o4-mini");
        assert_eq!(config.model.temperature, Some(0.1));
        assert_eq!(config.model.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = PipelineConfig::from_lookup(lookup(&[
            ("CLAUSEWATCH_CHUNK_MAX_TOKENS", "lots"),
            ("CLAUSEWATCH_MAX_OUTPUT_TOKENS", "-4"),
        ]));

        assert_eq!(config.chunking.max_tokens, 3000);
        assert_eq!(config.model.max_output_tokens, None);
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let mut config = PipelineConfig::default();
        config.chunking.max_tokens = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unbounded_ocr_and_zero_timeout() {
        let mut config = PipelineConfig::default();
        config.ocr.max_pages = 0;
        assert!(config.validate().unwrap_err().contains("max_pages"));

        let mut config = PipelineConfig::default();
        config.model.timeout_seconds = 0;
        assert!(config.validate().unwrap_err().contains("timeout_seconds"));

        let config = PipelineConfig::from_lookup(lookup(&[("CLAUSEWATCH_OCR_MAX_PAGES", "0")]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let mut config = PipelineConfig::default();
        config.model.api_key = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
