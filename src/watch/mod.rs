// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling trigger regex patterns into a [`TriggerSet`].
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Maintaining the live set of watched directories as the tree mutates.
//!
//! It does **not** know about process supervision; it only turns filesystem
//! changes into watch-set updates and restart decisions.

pub mod patterns;
pub mod tracker;
pub mod watcher;

pub use patterns::TriggerSet;
pub use tracker::DirectoryTracker;
pub use watcher::{RawEventReceiver, spawn_notify_watcher};
