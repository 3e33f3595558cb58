#![forbid(unsafe_code)]

//! **riftline-cli** – Command-line interface for Riftline.
//!
//! Two ways to run the pipeline: `daemon` serves the configured broker and
//! store until a shutdown signal arrives, and `scenario` replays a
//! directory of event files through an in-process pipeline and prints the
//! resulting match state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riftline_pipeline::{Pipeline, PipelineConfig, EVENTS_QUEUE};
use riftline_queue_core::{InMemoryQueue, MessageQueue};
use riftline_redis::{RedisQueue, RedisStore};
use riftline_state::{load_game_state, KeySchema};
use riftline_store_core::StateStore;
use riftline_store_memory::MemoryStore;
use riftline_types::view::GameState;

//─────────────────────────────
//  CLI structure
//─────────────────────────────

#[derive(Parser)]
#[command(name = "riftline")]
#[command(about = "Riftline - multiplayer battle telemetry pipeline")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run both pipeline consumers against the configured broker and store
    Daemon,
    /// Replay a directory of event JSON files through an in-process
    /// pipeline and print the final match state
    Scenario {
        /// Directory of per-event JSON files, published in filename order
        #[arg(long)]
        dir: PathBuf,
        /// Match to read back once the scenario has been consumed
        #[arg(long)]
        match_id: String,
        /// Store backend to use (memory, redis)
        #[arg(long, default_value = "memory")]
        store: String,
        /// Seconds to wait for the final state
        #[arg(long, default_value_t = 20)]
        timeout: u64,
    },
}

//─────────────────────────────
//  Main application
//─────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    let config = PipelineConfig::from_env();

    match cli.command {
        Commands::Daemon => run_daemon(config).await,
        Commands::Scenario { dir, match_id, store, timeout } => {
            run_scenario(config, dir, match_id, &store, timeout).await
        }
    }
}

//─────────────────────────────
//  Daemon mode
//─────────────────────────────

async fn run_daemon(config: PipelineConfig) -> Result<()> {
    info!("starting riftline daemon");

    let queue = Arc::new(
        RedisQueue::connect(&config.broker_url)
            .await
            .context("connecting to broker")?,
    );
    let store = Arc::new(
        RedisStore::connect(&config.store_url)
            .await
            .context("connecting to store")?,
    );

    let pipeline = Pipeline::spawn(&config, queue, store);
    info!("daemon running, waiting for messages");

    wait_for_shutdown_signal().await?;
    info!("shutdown signal received");
    pipeline.shutdown().await
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map_err(Into::into),
        _ = sigterm.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c().await.map_err(Into::into)
}

//─────────────────────────────
//  Scenario mode
//─────────────────────────────

async fn run_scenario(
    config: PipelineConfig,
    dir: PathBuf,
    match_id: String,
    store_kind: &str,
    timeout: u64,
) -> Result<()> {
    let store: Arc<dyn StateStore> = match store_kind {
        "memory" => Arc::new(MemoryStore::new()),
        "redis" => Arc::new(
            RedisStore::connect(&config.store_url)
                .await
                .context("connecting to store")?,
        ),
        other => anyhow::bail!("unsupported store type: {other}. Supported types: memory, redis"),
    };
    let queue = Arc::new(InMemoryQueue::new());

    let keys = KeySchema::new(
        config.events_namespace.clone(),
        config.state_namespace.clone(),
    );
    let pipeline = Pipeline::spawn(&config, queue.clone(), store.clone());

    publish_event_files(queue.as_ref(), &dir).await?;

    let state = poll_final_state(store.as_ref(), &keys, &match_id, timeout).await?;
    println!("{}", serde_json::to_string_pretty(&state)?);

    pipeline.shutdown().await
}

/// Publish every `.json` file in `dir`, in filename order, as one raw
/// event message each. Unreadable files abort; files that are not valid
/// JSON are skipped with a warning, like any other malformed producer.
async fn publish_event_files(queue: &dyn MessageQueue, dir: &PathBuf) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading scenario directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    paths.retain(|path| path.extension().is_some_and(|ext| ext == "json"));
    paths.sort();
    anyhow::ensure!(!paths.is_empty(), "no event files in {}", dir.display());

    for path in &paths {
        let body = std::fs::read(path)
            .with_context(|| format!("reading event file {}", path.display()))?;
        if serde_json::from_slice::<serde_json::Value>(&body).is_err() {
            warn!(file = %path.display(), "skipping file with invalid JSON");
            continue;
        }
        queue.publish(EVENTS_QUEUE, &body).await?;
        info!(file = %path.display(), "published event");
    }
    Ok(())
}

/// Poll the read path until the match has a final state or the timeout
/// elapses. Early reads fail while the queues are still draining.
async fn poll_final_state(
    store: &dyn StateStore,
    keys: &KeySchema,
    match_id: &str,
    timeout: u64,
) -> Result<GameState> {
    let deadline = Instant::now() + Duration::from_secs(timeout);
    loop {
        match load_game_state(store, keys, match_id).await {
            Ok(state) => return Ok(state),
            Err(err) => {
                if Instant::now() >= deadline {
                    return Err(err.context(format!(
                        "timed out after {timeout}s waiting for the state of {match_id}"
                    )));
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }
}

//─────────────────────────────
//  Utility functions
//─────────────────────────────

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
