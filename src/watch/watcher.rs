// src/watch/watcher.rs

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, Watcher};
use tokio::sync::mpsc;

/// Receiving side of the raw notify event stream.
pub type RawEventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Create the filesystem notification facility.
///
/// Returns the `RecommendedWatcher` (to be handed to the directory tracker,
/// which registers and removes per-directory watches on it) and the receiver
/// carrying raw events into the async event loop.
///
/// notify invokes its handler synchronously from a backend thread, so events
/// are bridged into the async world over an unbounded channel. Both events
/// and notification-source errors are forwarded; the loop decides which are
/// fatal. When the watcher is dropped the sender goes with it and the channel
/// closes, which the loop observes as source closure.
pub fn spawn_notify_watcher() -> Result<(RecommendedWatcher, RawEventReceiver)> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            if event_tx.send(res).is_err() {
                // The loop has already shut down; nothing left to notify.
                eprintln!("watchrun: dropping notify event, event loop closed");
            }
        },
        Config::default(),
    )?;

    Ok((watcher, event_rx))
}
