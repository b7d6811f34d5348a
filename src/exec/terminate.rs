// src/exec/terminate.rs

use anyhow::Result;

/// Capability for tearing down a whole process tree by its group identifier.
///
/// Process-group signalling is OS-specific (negative-PID convention on Unix,
/// job objects elsewhere), so the supervisor goes through this seam instead
/// of calling the OS directly. Alternate platforms supply a different
/// implementation without touching the event loop.
pub trait TerminateTree: Send + Sync {
    /// Forcefully signal the entire process group.
    ///
    /// A group that is already gone is success, not an error: watch-triggered
    /// restarts routinely race the child exiting on its own.
    fn terminate(&self, pgid: i32) -> Result<()>;

    /// True if the process group still has at least one live member.
    fn is_alive(&self, pgid: i32) -> bool;
}

/// Unix implementation: SIGKILL delivered with `killpg`, which signals every
/// process in the group so build toolchains and servers forked by the
/// supervised command die together with it.
#[derive(Debug, Default)]
pub struct GroupKiller;

#[cfg(unix)]
impl TerminateTree for GroupKiller {
    fn terminate(&self, pgid: i32) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            // Whole group already reaped; treat as already dead.
            Err(Errno::ESRCH) => Ok(()),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("signalling process group {pgid}"))),
        }
    }

    fn is_alive(&self, pgid: i32) -> bool {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        // Signal 0 probes for existence without delivering anything.
        killpg(Pid::from_raw(pgid), None::<Signal>).is_ok()
    }
}

/// Windows has no process groups in the Unix sense; `taskkill /T` walks and
/// kills the child's process tree instead.
#[cfg(windows)]
impl TerminateTree for GroupKiller {
    fn terminate(&self, pgid: i32) -> Result<()> {
        use std::process::Command;

        let status = Command::new("taskkill")
            .args(["/PID", &pgid.to_string(), "/T", "/F"])
            .status()
            .map_err(|err| anyhow::Error::new(err).context("running taskkill"))?;

        // taskkill reports failure for an already-gone pid; treat as dead.
        if !status.success() {
            tracing::debug!(pid = pgid, ?status, "taskkill reported no such process tree");
        }
        Ok(())
    }

    fn is_alive(&self, _pgid: i32) -> bool {
        // terminate() never fails with the tree still running here.
        false
    }
}
