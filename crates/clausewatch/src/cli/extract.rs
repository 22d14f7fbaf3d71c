use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use clausewatch_core::extract::{AttemptOutcome, ExtractionRun};
use clausewatch_core::{PipelineConfig, RawDocument, TextExtractor};
use console::style;

pub async fn run(file: &Path, json: bool) -> Result<()> {
    let document = RawDocument::from_path(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let config = PipelineConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    let extractor = TextExtractor::from_config(&config);
    let run = extractor.extract_traced(&document).await;

    if json {
        let value = serde_json::json!({
            "filename": document.filename,
            "result": run.text,
            "attempts": run.attempts,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_attempts(&run);
        if let Some(text) = run.text.text() {
            println!("{text}");
        }
    }

    if !run.text.is_success() {
        bail!(
            "No extraction strategy produced usable text for {}",
            document.filename
        );
    }

    Ok(())
}

pub(crate) fn print_attempts(run: &ExtractionRun) {
    for attempt in &run.attempts {
        let (mark, detail) = match &attempt.outcome {
            AttemptOutcome::Accepted { chars } => (style("✓").green(), format!("{chars} chars")),
            AttemptOutcome::Rejected { chars } => {
                (style("✗").yellow(), format!("{chars} chars, below quality threshold"))
            }
            AttemptOutcome::Failed { error } => (style("✗").red(), error.clone()),
            AttemptOutcome::Skipped => (style("-").dim(), "unavailable".to_string()),
        };
        eprintln!("  {mark} {}: {detail}", attempt.kind);
    }
}
