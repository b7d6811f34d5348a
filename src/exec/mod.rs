// src/exec/mod.rs

//! Process supervision layer.
//!
//! This module owns the single supervised child process, using
//! `tokio::process::Command`, and guarantees whole-process-group termination
//! across repeated restarts.
//!
//! - [`supervisor`] owns the start/kill/restart lifecycle.
//! - [`terminate`] abstracts the OS-specific group-kill mechanism.

pub mod supervisor;
pub mod terminate;

pub use supervisor::ProcessSupervisor;
pub use terminate::{GroupKiller, TerminateTree};
