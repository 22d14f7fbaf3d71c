use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clausewatch_core::{Chunker, Cl100kCounter, PipelineConfig, RawDocument, TextExtractor};
use console::style;

pub async fn run(file: &Path, max_tokens: Option<usize>, overlap: Option<usize>, json: bool) -> Result<()> {
    let config = PipelineConfig::from_env();
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;
    let document = RawDocument::from_path(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let extracted = TextExtractor::from_config(&config).extract(&document).await;
    let Some(text) = extracted.text() else {
        bail!(
            "No extraction strategy produced usable text for {}",
            document.filename
        );
    };

    let counter = Arc::new(Cl100kCounter::new()?);
    let chunker = Chunker::new(
        counter,
        max_tokens.unwrap_or(config.chunking.max_tokens),
        overlap.unwrap_or(config.chunking.overlap_tokens),
    );
    let chunks = chunker.split(text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&chunks)?);
        return Ok(());
    }

    for chunk in &chunks {
        println!(
            "{} chunk {}/{} ({} tokens)",
            style("──").dim(),
            chunk.index + 1,
            chunk.total,
            chunker.count_tokens(&chunk.text)
        );
        println!("{}", chunk.text);
    }
    eprintln!("{} chunks", chunks.len());

    Ok(())
}
