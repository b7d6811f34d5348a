// src/engine/mod.rs

//! Change-aggregation engine for watchrun.
//!
//! This module ties together:
//! - the per-window change batch (rapid event bursts collapsed by path)
//! - the debounced main event loop that reacts to:
//!   - raw filesystem events
//!   - debounce timer ticks
//!   - termination signals

pub mod batch;
pub mod runtime;

pub use batch::{ChangeBatch, ChangeKind};
pub use runtime::{AggregatorOptions, ChangeAggregator};
