// src/engine/runtime.rs

use std::time::Duration;

use anyhow::Result;
use notify::Event;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::engine::batch::ChangeBatch;
use crate::exec::ProcessSupervisor;
use crate::watch::{DirectoryTracker, RawEventReceiver, TriggerSet};

/// Options that influence the debounce behaviour.
///
/// Raw filesystem notifications arrive in rapid-fire bursts for a single
/// logical edit (editors that write-then-rename, build outputs). The
/// aggregator acts once per quiescent burst: a batch is dispatched only after
/// `quiescent_ticks` consecutive timer ticks with no new events.
#[derive(Debug, Clone)]
pub struct AggregatorOptions {
    /// Fixed interval of the debounce timer.
    pub tick_interval: Duration,
    /// Consecutive quiet ticks required to close a batch.
    pub quiescent_ticks: i32,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            quiescent_ticks: 2,
        }
    }
}

/// Debounce state: no pending batch, or a batch open with its quiescence
/// counter running. Termination is expressed by leaving the loop.
#[derive(Debug)]
enum BatchState {
    Idle,
    Collecting { batch: ChangeBatch, quiet_ticks: i32 },
}

/// The main event loop: consumes raw filesystem events, coalesces bursts into
/// one batch per debounce window, and on quiescence hands the batch to the
/// directory tracker (structural watch updates) and the trigger set (restart
/// decision), restarting the supervised process when triggered.
///
/// This loop is the only writer of the open batch and all watch-set mutations
/// are funnelled through it synchronously, so none of these structures need
/// locking.
pub struct ChangeAggregator {
    tracker: DirectoryTracker,
    triggers: TriggerSet,
    supervisor: ProcessSupervisor,
    options: AggregatorOptions,

    /// Raw event stream from the notify backend.
    events_rx: RawEventReceiver,

    /// External termination signal (Ctrl-C in the binary, a plain send in
    /// tests). A closed channel is treated as a shutdown request too.
    shutdown_rx: mpsc::Receiver<()>,
}

impl ChangeAggregator {
    pub fn new(
        tracker: DirectoryTracker,
        triggers: TriggerSet,
        supervisor: ProcessSupervisor,
        options: AggregatorOptions,
        events_rx: RawEventReceiver,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        Self {
            tracker,
            triggers,
            supervisor,
            options,
            events_rx,
            shutdown_rx,
        }
    }

    /// Run the loop until the notification source closes or a termination
    /// signal arrives. On either exit path the supervised process group is
    /// killed before returning; the tool never exits leaving the child
    /// orphaned.
    pub async fn run(mut self) -> Result<()> {
        info!("change aggregator started");

        let mut ticker = interval(self.options.tick_interval);
        let mut state = BatchState::Idle;

        loop {
            tokio::select! {
                received = self.events_rx.recv() => {
                    match received {
                        Some(Ok(event)) => self.on_event(&mut state, event),
                        Some(Err(err)) => {
                            // Source errors are logged and looped past; only
                            // closure of the source ends the loop.
                            warn!(error = %err, "notification source error");
                        }
                        None => {
                            info!("notification source closed, shutting down");
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if let Some(batch) = self.on_tick(&mut state) {
                        self.dispatch(batch).await;
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!("termination signal received, shutting down");
                    break;
                }
            }
        }

        self.supervisor.kill().await?;
        info!("change aggregator exiting");
        Ok(())
    }

    /// Merge a raw event into the current window, opening one if idle.
    fn on_event(&mut self, state: &mut BatchState, event: Event) {
        match state {
            BatchState::Idle => {
                let mut batch = ChangeBatch::new();
                batch.merge_event(&event);
                debug!(changes = batch.len(), "opened new change batch");
                *state = BatchState::Collecting {
                    batch,
                    quiet_ticks: 0,
                };
            }
            BatchState::Collecting { batch, quiet_ticks } => {
                // Push the quiescence counter back while events keep arriving,
                // without letting it run away below the window.
                if *quiet_ticks >= 0 && *quiet_ticks < self.options.quiescent_ticks {
                    *quiet_ticks -= 1;
                }
                batch.merge_event(&event);
            }
        }
    }

    /// Advance the quiescence counter; returns the closed batch once the
    /// window has been quiet for long enough.
    fn on_tick(&mut self, state: &mut BatchState) -> Option<ChangeBatch> {
        let BatchState::Collecting { quiet_ticks, .. } = state else {
            return None;
        };

        *quiet_ticks += 1;
        if *quiet_ticks < self.options.quiescent_ticks {
            return None;
        }

        match std::mem::replace(state, BatchState::Idle) {
            BatchState::Collecting { batch, .. } => Some(batch),
            BatchState::Idle => None,
        }
    }

    /// Consume one closed batch: reconcile the watch set, then restart the
    /// supervised process if any changed path trips a trigger.
    async fn dispatch(&mut self, batch: ChangeBatch) {
        debug!(changes = batch.len(), "dispatching change batch");

        self.tracker.reconcile(&batch);

        if !self.triggers.should_trigger(&batch) {
            debug!("no trigger matched; batch discarded");
            return;
        }

        // A failed launch leaves no child running but the loop stays
        // serviceable; the next triggering batch tries again.
        if let Err(err) = self.supervisor.restart().await {
            error!(error = %err, "restart failed");
        }
    }
}
