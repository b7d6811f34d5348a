// src/exec/supervisor.rs

use std::process::Stdio;

use anyhow::{Context, Result, bail};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::exec::terminate::{GroupKiller, TerminateTree};

/// Owns the single supervised child process.
///
/// At most one process group is alive at a time. The group identifier is
/// recorded on a successful spawn and cleared only after a confirmed kill, so
/// a failed `start` leaves no live handle and a failed `kill` never loses
/// track of a running group.
pub struct ProcessSupervisor {
    program: String,
    args: Vec<String>,
    child: Option<Child>,
    pgid: Option<i32>,
    terminator: Box<dyn TerminateTree>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("pgid", &self.pgid)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    /// Build a supervisor for the given command line (executable + args).
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .context("empty command line; nothing to supervise")?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            child: None,
            pgid: None,
            terminator: Box::new(GroupKiller),
        })
    }

    /// Replace the process-group termination mechanism.
    pub fn with_terminator(mut self, terminator: Box<dyn TerminateTree>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Process-group identifier of the live child, if any.
    pub fn pgid(&self) -> Option<i32> {
        self.pgid
    }

    /// True if a supervised process group is currently considered running.
    pub fn is_running(&self) -> bool {
        self.pgid.is_some()
    }

    /// Launch the command in its own process group, with stdout/stderr
    /// connected to our own streams. Does not wait for the child; its
    /// lifetime is independent of the event loop.
    pub async fn start(&mut self) -> Result<()> {
        if let Some(pgid) = self.pgid {
            bail!("process group {pgid} is still running; refusing to double-launch");
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // New process group so descendants can be signalled together.
        #[cfg(unix)]
        cmd.process_group(0);

        let child = cmd
            .spawn()
            .with_context(|| format!("spawning supervised command '{}'", self.program))?;

        let pid = child
            .id()
            .context("spawned child has no pid (already reaped)")?;

        info!(pid, cmd = %self.program, "started supervised process (+pid {pid})");

        self.pgid = Some(pid as i32);
        self.child = Some(child);
        Ok(())
    }

    /// Forcefully terminate the whole process group, then reap the direct
    /// child. No-op when nothing is running. Signal delivery failing because
    /// the group is already gone is success; only a group that is confirmed
    /// still alive after a failed signal is an error.
    pub async fn kill(&mut self) -> Result<()> {
        let Some(pgid) = self.pgid else {
            debug!("kill requested with no supervised process; nothing to do");
            return Ok(());
        };

        info!(pid = pgid, "stopping supervised process (-pid {pgid})");

        if let Err(err) = self.terminator.terminate(pgid) {
            if self.terminator.is_alive(pgid) {
                return Err(err)
                    .with_context(|| format!("process group {pgid} survived termination"));
            }
            warn!(pid = pgid, error = %err, "signal failed but group already gone");
        }

        // Reap so the next start only ever runs after the previous child is
        // fully terminated, never alongside it.
        if let Some(mut child) = self.child.take() {
            let _ = child.wait().await;
        }

        self.pgid = None;
        Ok(())
    }

    /// `kill` then `start`. If the old group cannot be confirmed dead the
    /// restart is aborted with the old process left running; a double launch
    /// is never attempted.
    pub async fn restart(&mut self) -> Result<()> {
        self.kill()
            .await
            .context("restart aborted; previous process group still running")?;
        self.start().await
    }
}
