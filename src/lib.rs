// src/lib.rs

pub mod cli;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::info;

use crate::cli::CliArgs;
use crate::engine::{AggregatorOptions, ChangeAggregator};
use crate::exec::ProcessSupervisor;
use crate::watch::{DirectoryTracker, TriggerSet, spawn_notify_watcher};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - trigger pattern compilation
/// - the notify watcher + directory tracker (initial tree walk)
/// - the process supervisor (initial launch)
/// - Ctrl-C handling
/// - the debounced aggregator loop
pub async fn run(args: CliArgs) -> Result<()> {
    let root = PathBuf::from(&args.dir);
    let root = root
        .canonicalize()
        .with_context(|| format!("resolving watch root {:?}", args.dir))?;

    let triggers = TriggerSet::compile(&args.patterns);
    if triggers.is_empty() {
        info!("no trigger patterns; every change batch will restart the command");
    }

    // Notification facility; failure to establish it is fatal.
    let (watcher, events_rx) = spawn_notify_watcher()?;

    let mut tracker = DirectoryTracker::new(watcher);
    tracker.walk(&root)?;
    info!(
        directories = tracker.watched_count(),
        "watching {:?}", root
    );

    // Launch the supervised command once up front; failure here is a setup
    // error, unlike launch failures on later restarts.
    let mut supervisor = ProcessSupervisor::new(&args.command)?;
    supervisor
        .start()
        .await
        .context("initial launch of supervised command failed")?;

    // Ctrl-C → graceful shutdown (the aggregator kills the child on exit).
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("watchrun: failed to listen for Ctrl+C: {err}");
            // Keep the sender alive; a dropped channel would read as a
            // shutdown request to the loop.
            std::future::pending::<()>().await;
        }
        let _ = shutdown_tx.send(()).await;
    });

    let aggregator = ChangeAggregator::new(
        tracker,
        triggers,
        supervisor,
        AggregatorOptions::default(),
        events_rx,
        shutdown_rx,
    );
    aggregator.run().await
}
