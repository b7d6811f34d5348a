// src/watch/tracker.rs

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::engine::{ChangeBatch, ChangeKind};

/// Maintains the live set of watched directories.
///
/// Every directory in the set has an active OS-level watch registered with
/// `notify`; registration is per-directory (`RecursiveMode::NonRecursive`) so
/// this tracker, not the notify backend, owns the watch set and can keep it
/// consistent as directories are created and removed mid-run.
///
/// Hidden directories (name starting with `.` and longer than one character)
/// are skipped together with their entire subtree.
pub struct DirectoryTracker {
    watcher: RecommendedWatcher,
    watched: HashSet<PathBuf>,
}

impl std::fmt::Debug for DirectoryTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryTracker")
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl DirectoryTracker {
    /// Wrap a notify watcher. The tracker keeps the watcher alive; dropping
    /// the tracker stops all file watching.
    pub fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            watcher,
            watched: HashSet::new(),
        }
    }

    /// True if `path` currently carries an active watch.
    pub fn is_watched(&self, path: &Path) -> bool {
        self.watched.contains(path)
    }

    /// Number of directories currently watched.
    pub fn watched_count(&self) -> usize {
        self.watched.len()
    }

    /// Recursively register `root` and every non-hidden directory beneath it.
    ///
    /// Used for the initial scan and to pick up directories created mid-run.
    /// The root itself is registered even when its own name is hidden: an
    /// explicitly supplied root (or the canonicalized cwd, which may resolve
    /// to a dot-named path) is what the caller asked to watch, so the hidden
    /// check only applies to what is found beneath it. The root must be
    /// readable; failures deeper in the tree are tolerated (the directory
    /// may have vanished between listing and visit, which is an expected
    /// race with filesystem notification).
    pub fn walk(&mut self, root: &Path) -> Result<()> {
        let meta = fs::metadata(root)
            .with_context(|| format!("reading metadata for watch root {root:?}"))?;

        if !meta.is_dir() {
            return Ok(());
        }

        self.register(root);
        self.descend(root);
        Ok(())
    }

    /// Apply one debounced change batch to the watch set.
    ///
    /// Creations that resolve to directories are walked (registering the new
    /// subtree); removals and renames drop the path and anything beneath it.
    /// After this returns the watch set reflects the directories that existed
    /// at the end of the batch, modulo races inherent to notification.
    pub fn reconcile(&mut self, batch: &ChangeBatch) {
        for (path, kind) in batch.iter() {
            match kind {
                ChangeKind::Create => {
                    if path.is_dir() {
                        if is_hidden_dir(path) {
                            info!(path = ?path, "skipping hidden directory");
                            continue;
                        }
                        if let Err(err) = self.walk(path) {
                            debug!(
                                path = ?path,
                                error = %err,
                                "created directory vanished before walk"
                            );
                        }
                    }
                }
                ChangeKind::Remove | ChangeKind::Rename => {
                    self.deregister_subtree(path);
                }
                ChangeKind::Modify | ChangeKind::Other => {}
            }
        }
    }

    fn visit(&mut self, dir: &Path) {
        if is_hidden_dir(dir) {
            info!(path = ?dir, "skipping hidden directory");
            return;
        }

        self.register(dir);
        self.descend(dir);
    }

    fn descend(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(path = ?dir, error = %err, "directory unreadable during walk");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                self.visit(&path);
            }
        }
    }

    fn register(&mut self, dir: &Path) {
        if self.watched.contains(dir) {
            return;
        }

        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                debug!(path = ?dir, "watching directory");
                self.watched.insert(dir.to_path_buf());
            }
            Err(err) => {
                // Expected race: the directory can disappear between the walk
                // seeing it and the watch being added.
                warn!(path = ?dir, error = %err, "failed to add watch; skipping");
            }
        }
    }

    /// Drop `path` and every watched directory beneath it from the watch set.
    ///
    /// A failing OS-level watch removal is treated as success: removal racing
    /// the deletion of the directory itself is expected.
    fn deregister_subtree(&mut self, path: &Path) {
        let doomed: Vec<PathBuf> = self
            .watched
            .iter()
            .filter(|watched| watched.starts_with(path))
            .cloned()
            .collect();

        for dir in doomed {
            if let Err(err) = self.watcher.unwatch(&dir) {
                debug!(path = ?dir, error = %err, "watch already gone on removal");
            }
            self.watched.remove(&dir);
            info!(path = ?dir, "stopped watching removed directory");
        }
    }
}

/// A directory is hidden if its own name starts with `.` and is longer than
/// one character, so `.` (the current directory) is not considered hidden.
fn is_hidden_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.') && name.len() > 1)
        .unwrap_or(false)
}
