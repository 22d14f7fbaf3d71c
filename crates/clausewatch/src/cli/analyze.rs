use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clausewatch_core::{
    AnalysisKind, AnalysisPipeline, ConsolidatedReport, MemoryReportStore, OpenAiClient,
    PipelineConfig, RawDocument, ReportId, Severity,
};
use console::style;
use tokio_util::sync::CancellationToken;

pub async fn run(
    file: &Path,
    kind: AnalysisKind,
    model: Option<String>,
    owner: &str,
    json: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut config = PipelineConfig::from_env();
    if let Some(model) = model {
        config.model.model = model;
    }

    let client = OpenAiClient::from_config(&config.model)
        .context("set CLAUSEWATCH_API_KEY or OPENAI_API_KEY to analyse documents")?;
    let pipeline = AnalysisPipeline::from_config(&config, Arc::new(client), kind)?;

    let document = RawDocument::from_path(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let store = MemoryReportStore::new();
    let (id, output) = pipeline
        .analyze_and_store(&document, owner, None, &store, cancel)
        .await?;

    if json {
        let value = serde_json::json!({
            "id": id,
            "strategy": output.strategy,
            "report": output.report,
            "compliance_score": output.report.compliance_score(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_report(id, &output.report);
    }

    Ok(())
}

fn print_report(id: ReportId, report: &ConsolidatedReport) {
    eprintln!("{} Report {}", style("●").blue(), style(id).bold());
    eprintln!(
        "  Chunks: {} analysed, {} failed, {} total",
        report.chunks_analyzed, report.chunks_failed, report.chunks_total
    );
    if !report.complete {
        eprintln!("  {}", style("Incomplete: analysis was cancelled").yellow());
    }

    if report.is_clean() {
        println!("{} No issues detected.", style("✓").green());
        return;
    }

    for finding in report.real_findings() {
        let severity = match finding.severity {
            Severity::High => style(finding.severity.as_str()).red().bold(),
            Severity::Medium => style(finding.severity.as_str()).yellow(),
            Severity::Low => style(finding.severity.as_str()).dim(),
        };
        println!(
            "[{severity}] {} / {}: {}",
            finding.section, finding.clause, finding.description
        );
        println!("    → {}", finding.recommendation);
        if let Some(snippet) = &finding.snippet {
            println!("    \"{snippet}\"");
        }
    }

    if report.kind == AnalysisKind::Compliance {
        println!("Compliance score: {}", report.compliance_score());
    }
}
