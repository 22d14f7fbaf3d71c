use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use clausewatch::cli::{self, Cli, Commands};

const DEFAULT_LOG_FILTER: &str = "clausewatch=info";

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing the current chunk");
            on_interrupt.cancel();
        }
    });

    dispatch(cli.command, &cancel).await
}

async fn dispatch(command: Commands, cancel: &CancellationToken) -> Result<()> {
    match command {
        Commands::Extract { file, json } => cli::extract::run(&file, json).await,
        Commands::Chunks {
            file,
            max_tokens,
            overlap,
            json,
        } => cli::chunks::run(&file, max_tokens, overlap, json).await,
        Commands::Analyze {
            file,
            kind,
            model,
            owner,
            json,
        } => cli::analyze::run(&file, kind, model, &owner, json, cancel).await,
    }
}
