use std::error::Error;
use std::fs;

use notify::Event;
use notify::event::{EventKind, ModifyKind, RenameMode};
use watchrun::engine::{ChangeBatch, ChangeKind};
use watchrun::watch::{DirectoryTracker, spawn_notify_watcher};

type TestResult = Result<(), Box<dyn Error>>;

fn new_tracker() -> Result<DirectoryTracker, Box<dyn Error>> {
    // The receiver is dropped; these tests exercise watch registration, not
    // event delivery.
    let (watcher, _events_rx) = spawn_notify_watcher()?;
    Ok(DirectoryTracker::new(watcher))
}

#[test]
fn walk_skips_hidden_directories_and_their_subtrees() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    fs::create_dir_all(root.join(".git/objects"))?;
    fs::create_dir_all(root.join("src/nested"))?;
    fs::write(root.join("src/main.go"), "package main")?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;

    assert!(tracker.is_watched(&root));
    assert!(tracker.is_watched(&root.join("src")));
    assert!(tracker.is_watched(&root.join("src/nested")));
    assert!(!tracker.is_watched(&root.join(".git")));
    assert!(!tracker.is_watched(&root.join(".git/objects")));
    assert_eq!(tracker.watched_count(), 3);
    Ok(())
}

#[test]
fn walk_on_missing_root_is_an_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("does-not-exist");

    let mut tracker = new_tracker()?;
    assert!(tracker.walk(&missing).is_err());
    assert_eq!(tracker.watched_count(), 0);
    Ok(())
}

#[test]
fn reconcile_drops_removed_directories_without_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let doomed = root.join("build");
    fs::create_dir_all(doomed.join("deep"))?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;
    assert!(tracker.is_watched(&doomed));
    assert!(tracker.is_watched(&doomed.join("deep")));

    // Directory vanishes from disk first, so the OS-level watch removal
    // races the deletion; that must still count as success.
    fs::remove_dir_all(&doomed)?;

    let mut batch = ChangeBatch::new();
    batch.record(doomed.clone(), ChangeKind::Remove);
    tracker.reconcile(&batch);

    assert!(!tracker.is_watched(&doomed));
    assert!(!tracker.is_watched(&doomed.join("deep")));
    assert!(tracker.is_watched(&root));
    Ok(())
}

#[test]
fn reconcile_walks_newly_created_directories() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;
    assert_eq!(tracker.watched_count(), 1);

    let created = root.join("pkg");
    fs::create_dir_all(created.join("inner"))?;
    fs::create_dir_all(created.join(".cache"))?;

    let mut batch = ChangeBatch::new();
    batch.record(created.clone(), ChangeKind::Create);
    tracker.reconcile(&batch);

    assert!(tracker.is_watched(&created));
    assert!(tracker.is_watched(&created.join("inner")));
    assert!(!tracker.is_watched(&created.join(".cache")));
    Ok(())
}

#[test]
fn reconcile_ignores_plain_file_changes() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;

    let file = root.join("notes.txt");
    fs::write(&file, "hello")?;

    let mut batch = ChangeBatch::new();
    batch.record(file.clone(), ChangeKind::Create);
    batch.record(root.join("gone.txt"), ChangeKind::Remove);
    tracker.reconcile(&batch);

    assert!(!tracker.is_watched(&file));
    assert_eq!(tracker.watched_count(), 1);
    Ok(())
}

#[test]
fn rename_within_the_tree_moves_the_watch() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let old = root.join("old-name");
    fs::create_dir(&old)?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;
    assert!(tracker.is_watched(&old));

    let new = root.join("new-name");
    fs::rename(&old, &new)?;

    // The raw events as the inotify backend reports them: the source leaves,
    // the destination arrives as Name(To).
    let mut batch = ChangeBatch::new();
    batch.merge_event(
        &Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From))).add_path(old.clone()),
    );
    batch.merge_event(
        &Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(new.clone()),
    );
    tracker.reconcile(&batch);

    assert!(!tracker.is_watched(&old));
    assert!(tracker.is_watched(&new));
    Ok(())
}

#[test]
fn directory_moved_into_the_tree_is_registered() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;
    assert_eq!(tracker.watched_count(), 1);

    // A directory moved in from outside surfaces as a lone Name(To) event
    // carrying the destination path; by dispatch time the tree exists.
    let dest = root.join("moved-in");
    fs::create_dir_all(dest.join("inner"))?;

    let mut batch = ChangeBatch::new();
    batch.merge_event(
        &Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To))).add_path(dest.clone()),
    );
    tracker.reconcile(&batch);

    assert!(tracker.is_watched(&dest));
    assert!(tracker.is_watched(&dest.join("inner")));
    Ok(())
}

#[test]
fn explicitly_supplied_hidden_root_is_still_watched() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().join(".cfgroot");
    fs::create_dir_all(root.join("src"))?;
    let root = root.canonicalize()?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;

    // The hidden-name rule applies beneath the root, never to the root the
    // caller asked for (a canonicalized cwd may well be dot-named).
    assert!(tracker.is_watched(&root));
    assert!(tracker.is_watched(&root.join("src")));
    assert_eq!(tracker.watched_count(), 2);
    Ok(())
}

#[test]
fn reconcile_skips_created_hidden_directories() -> TestResult {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;

    let mut tracker = new_tracker()?;
    tracker.walk(&root)?;

    let hidden = root.join(".secrets");
    fs::create_dir(&hidden)?;

    let mut batch = ChangeBatch::new();
    batch.record(hidden.clone(), ChangeKind::Create);
    tracker.reconcile(&batch);

    assert!(!tracker.is_watched(&hidden));
    assert_eq!(tracker.watched_count(), 1);
    Ok(())
}
