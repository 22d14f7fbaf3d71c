pub mod analyze;
pub mod chunks;
pub mod extract;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clausewatch_core::AnalysisKind;

#[derive(Parser)]
#[command(
    name = "cwatch",
    about = "Flag risky and non-compliant clauses in contracts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the text of a document
    Extract {
        /// Document to read (pdf, docx, or any text file)
        file: PathBuf,
        /// Print the result and the strategy log as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how a document's text is split for analysis
    Chunks {
        file: PathBuf,
        /// Token budget per chunk (defaults to configuration)
        #[arg(long)]
        max_tokens: Option<usize>,
        /// Words carried over from the previous chunk (defaults to configuration)
        #[arg(long)]
        overlap: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Analyse a document with the configured model
    Analyze {
        file: PathBuf,
        /// risk or compliance
        #[arg(short, long, default_value = "risk")]
        kind: AnalysisKind,
        /// Override the configured model
        #[arg(long)]
        model: Option<String>,
        /// Owner recorded on the stored report
        #[arg(long, default_value = "local")]
        owner: String,
        #[arg(long)]
        json: bool,
    },
}
