//! Portwatch - Vessel Delay Operational Intelligence
//!
//! Long-lived process: a feed connector subscribed to live position
//! reports plus a periodic prediction worker over the shared store.
//!
//! # Usage
//!
//! ```bash
//! # Run connector and worker together (default)
//! FEED_API_KEY=... REASONING_API_TOKEN=... portwatch
//!
//! # Feed ingestion only
//! FEED_API_KEY=... portwatch --connector-only
//!
//! # One worker batch pass, then exit (cron-style invocation)
//! REASONING_API_TOKEN=... portwatch --worker-only --once
//! ```
//!
//! # Environment Variables
//!
//! - `PORTWATCH_CONFIG`: path to the TOML config file
//! - `FEED_API_KEY`: feed subscription credential
//! - `REASONING_API_TOKEN`: reasoning endpoint bearer token
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use portwatch::config::Config;
use portwatch::feed::FeedConnector;
use portwatch::reasoning::HttpReasoningClient;
use portwatch::store::SledStore;
use portwatch::worker::PredictionWorker;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "portwatch")]
#[command(about = "Portwatch vessel delay prediction pipeline")]
#[command(version)]
struct CliArgs {
    /// Run only the feed connector (no prediction worker)
    #[arg(long, conflicts_with = "worker_only")]
    connector_only: bool,

    /// Run only the prediction worker (no feed connector)
    #[arg(long)]
    worker_only: bool,

    /// With --worker-only: run a single batch pass and exit
    #[arg(long, requires = "worker_only")]
    once: bool,

    /// Path to the TOML config file (overrides PORTWATCH_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Override the store path from the config file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<String>,
}

type TaskName = &'static str;

// ============================================================================
// Task Spawning
// ============================================================================

fn spawn_connector(
    task_set: &mut JoinSet<Result<TaskName>>,
    config: &Config,
    store: Arc<SledStore>,
    cancel_token: CancellationToken,
) {
    let connector = FeedConnector::new(config.feed.clone(), store, cancel_token);
    task_set.spawn(async move {
        connector.run().await;
        Ok("feed-connector")
    });
}

fn spawn_worker(
    task_set: &mut JoinSet<Result<TaskName>>,
    config: &Config,
    store: Arc<SledStore>,
    cancel_token: CancellationToken,
) -> Result<()> {
    let worker = build_worker(config, store)?;
    let interval = std::time::Duration::from_secs(config.worker.interval_secs);
    task_set.spawn(async move {
        worker.run(interval, cancel_token).await;
        Ok("prediction-worker")
    });
    Ok(())
}

fn build_worker(
    config: &Config,
    store: Arc<SledStore>,
) -> Result<PredictionWorker<SledStore, HttpReasoningClient>> {
    let backend = HttpReasoningClient::new(
        &config.reasoning.endpoint_url,
        &config.reasoning.api_token,
    )
    .context("Failed to build reasoning client")?
    .with_max_new_tokens(config.reasoning.max_new_tokens)
    .with_temperature(config.reasoning.temperature);

    Ok(PredictionWorker::new(store, Arc::new(backend))
        .with_traffic_radius_nm(config.worker.traffic_radius_nm)
        .with_attempt_budget(config.worker.attempt_budget))
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!(task = task_name, "Supervisor: task completed normally");
                    }
                    Some(Ok(Err(e))) => {
                        error!(error = %e, "Supervisor: task failed");
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "Supervisor: task panicked");
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Some(path) = &args.config {
        // The env var is the single search-order entry point; the flag
        // just feeds it before loading.
        std::env::set_var("PORTWATCH_CONFIG", path);
    }
    let mut config = Config::load();
    if let Some(path) = &args.data_dir {
        config.store.path = path.clone();
    }

    let run_connector = !args.worker_only;
    let run_worker = !args.connector_only;
    config
        .validate(run_connector, run_worker)
        .context("Configuration check failed")?;

    let store = Arc::new(
        SledStore::open(&config.store.path)
            .with_context(|| format!("Failed to open store at {}", config.store.path))?,
    );

    info!("Portwatch starting");
    info!(store = %config.store.path, "Store opened");

    // Single batch pass for scheduled invocations.
    if args.once {
        let worker = build_worker(&config, store)?;
        let stats = worker.run_batch().await;
        info!(
            completed = stats.completed,
            failed = stats.failed,
            "Single worker pass finished"
        );
        return Ok(());
    }

    let cancel_token = CancellationToken::new();

    // Ctrl-C triggers coordinated shutdown of every task.
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            signal_token.cancel();
        }
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    if run_connector {
        spawn_connector(&mut task_set, &config, Arc::clone(&store), cancel_token.clone());
    }
    if run_worker {
        spawn_worker(&mut task_set, &config, Arc::clone(&store), cancel_token.clone())?;
    }

    run_supervisor(&mut task_set, cancel_token).await?;

    info!("Portwatch stopped");
    Ok(())
}
