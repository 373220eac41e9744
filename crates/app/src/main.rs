//! Daemon entry point: load config, connect providers and the index, then
//! hand control to the host loop.  `SIGUSR1` requests a manual refresh of
//! the last pipeline run.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use marginalia_config::AppConfig;
use marginalia_pipeline::Orchestrator;
use marginalia_providers::Providers;
use marginalia_runtime::{CorpusIndexer, Host, HostUpdate};

#[derive(Debug, Parser)]
#[command(name = "marginalia", version, about = "Ambient retrieval companion for plain-text notes")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "marginalia.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Watch the notes directory and run the pipeline on completed thoughts
    /// (the default).
    Watch,
    /// Rebuild the vector index from the notes directory and exit.
    Index,
    /// Write a default configuration file and exit.
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config).context("loading configuration")?;
    init_tracing(&config.telemetry.log_level);

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Init => {
            config.save_to(&cli.config)
                .with_context(|| format!("writing {}", cli.config))?;
            info!(path = %cli.config, "configuration written");
            Ok(())
        }
        Commands::Index => {
            let (indexer, _) = build_stack(&config).await?;
            let records = indexer.index_corpus().await?;
            info!(records, "one-shot corpus index complete");
            Ok(())
        }
        Commands::Watch => watch(config).await,
    }
}

async fn watch(config: AppConfig) -> Result<()> {
    let (indexer, orchestrator) = build_stack(&config).await?;

    // Bootstrap an empty index so the first trigger has something to
    // retrieve against.  Failure here degrades to an empty index; the
    // dimension-mismatch recovery path can rebuild later.
    let count = match orchestrator.index.count().await {
        Ok(count) => count,
        Err(err) => {
            warn!(?err, "could not count index records; assuming empty");
            0
        }
    };
    if count == 0 {
        if let Err(err) = indexer.index_corpus().await {
            warn!(?err, "initial corpus index failed; continuing with an empty index");
        }
    } else {
        info!(records = count, "index already populated; skipping initial corpus walk");
    }

    let host = Host::new(config, orchestrator);
    wire_refresh_signal(host.refresh_handle());
    log_updates(host.subscribe());
    host.run().await
}

/// Construct the index, providers, and orchestrator shared by every mode.
async fn build_stack(config: &AppConfig) -> Result<(Arc<CorpusIndexer>, Arc<Orchestrator>)> {
    let index = marginalia_index::connect(&config.index)
        .await
        .context("connecting vector index")?;
    let providers = Arc::new(Providers::from_config(&config.providers));
    let indexer = Arc::new(CorpusIndexer::new(
        index.clone(),
        providers.clone(),
        &config.watch,
    ));
    let orchestrator = Arc::new(Orchestrator {
        index,
        providers,
        reindex: indexer.clone(),
    });
    Ok((indexer, orchestrator))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Surface final results on the console; partial updates stay at debug in
/// the host.
fn log_updates(mut updates: tokio::sync::broadcast::Receiver<HostUpdate>) {
    tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            if let HostUpdate::Final(result) = update {
                for snippet in &result.snippets {
                    info!(title = %snippet.title, similarity = snippet.similarity, "related note");
                }
                info!(summary = %result.summary, "summary");
            }
        }
    });
}

#[cfg(unix)]
fn wire_refresh_signal(refresh: mpsc::Sender<()>) {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut stream = match signal(SignalKind::user_defined1()) {
            Ok(stream) => stream,
            Err(err) => {
                warn!(?err, "SIGUSR1 handler unavailable; manual refresh disabled");
                return;
            }
        };
        while stream.recv().await.is_some() {
            info!("refresh requested via SIGUSR1");
            let _ = refresh.send(()).await;
        }
    });
}

#[cfg(not(unix))]
fn wire_refresh_signal(_refresh: mpsc::Sender<()>) {}
