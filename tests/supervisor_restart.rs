#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use watchrun::exec::{GroupKiller, ProcessSupervisor, TerminateTree};

type TestResult = Result<(), Box<dyn Error>>;

fn sleeper() -> Result<ProcessSupervisor, Box<dyn Error>> {
    Ok(ProcessSupervisor::new(&[
        "sleep".to_string(),
        "30".to_string(),
    ])?)
}

#[tokio::test]
async fn kill_without_a_running_process_is_a_no_op() -> TestResult {
    let mut supervisor = sleeper()?;
    assert!(!supervisor.is_running());

    supervisor.kill().await?;
    assert!(!supervisor.is_running());
    Ok(())
}

#[tokio::test]
async fn restart_with_no_prior_process_only_starts() -> TestResult {
    let mut supervisor = sleeper()?;

    supervisor.restart().await?;
    assert!(supervisor.is_running());
    assert!(supervisor.pgid().is_some());

    supervisor.kill().await?;
    Ok(())
}

#[tokio::test]
async fn start_records_the_process_group_and_kill_clears_it() -> TestResult {
    let mut supervisor = sleeper()?;
    supervisor.start().await?;

    let pgid = supervisor.pgid().expect("live process group after start");
    assert!(GroupKiller.is_alive(pgid));

    supervisor.kill().await?;
    assert!(!supervisor.is_running());
    assert!(supervisor.pgid().is_none());
    assert!(!GroupKiller.is_alive(pgid));
    Ok(())
}

#[tokio::test]
async fn rapid_restarts_never_leave_two_live_groups() -> TestResult {
    let mut supervisor = sleeper()?;
    supervisor.start().await?;
    let first = supervisor.pgid().expect("first process group");

    supervisor.restart().await?;
    let second = supervisor.pgid().expect("second process group");

    assert_ne!(first, second);
    // The first group must be fully terminated before the second exists.
    assert!(!GroupKiller.is_alive(first));
    assert!(GroupKiller.is_alive(second));

    supervisor.restart().await?;
    let third = supervisor.pgid().expect("third process group");
    assert!(!GroupKiller.is_alive(second));
    assert!(GroupKiller.is_alive(third));

    supervisor.kill().await?;
    assert!(!GroupKiller.is_alive(third));
    Ok(())
}

#[tokio::test]
async fn launch_failure_leaves_no_live_handle() -> TestResult {
    let mut supervisor =
        ProcessSupervisor::new(&["/definitely/not/a/real/binary".to_string()])?;

    assert!(supervisor.start().await.is_err());
    assert!(!supervisor.is_running());
    assert!(supervisor.pgid().is_none());

    // A later restart is still serviceable (and fails the same way).
    assert!(supervisor.restart().await.is_err());
    assert!(!supervisor.is_running());
    Ok(())
}

#[tokio::test]
async fn empty_command_line_is_rejected_up_front() {
    assert!(ProcessSupervisor::new(&[]).is_err());
}

#[tokio::test]
async fn descendants_die_with_the_group() -> TestResult {
    // sh forks a grandchild; killing only the direct child would orphan it.
    let mut supervisor = ProcessSupervisor::new(&[
        "sh".to_string(),
        "-c".to_string(),
        "sleep 30 & wait".to_string(),
    ])?;

    supervisor.start().await?;
    let pgid = supervisor.pgid().expect("live process group");

    // Give the shell a moment to fork.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(GroupKiller.is_alive(pgid));

    supervisor.kill().await?;
    // The grandchild is reparented and reaped by init; give it a moment.
    tokio::time::sleep(Duration::from_millis(200)).await;
    // The whole group, grandchild included, must be gone.
    assert!(!GroupKiller.is_alive(pgid));
    Ok(())
}
