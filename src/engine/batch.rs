// src/engine/batch.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};
use tracing::debug;

/// Classified change for a single path, reduced from `notify::EventKind`.
///
/// Only the distinctions the engine acts on are kept: creations may add new
/// directories to the watch set, removals and renames take them out, and
/// everything else is just "the path changed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    Rename,
    Other,
}

impl ChangeKind {
    /// Reduce a notify event kind to the classification used by the engine.
    ///
    /// The destination side of a rename is a creation: on Linux the inotify
    /// backend reports a path moved *into* the tree as
    /// `Modify(Name(RenameMode::To))` carrying the new path, and that path
    /// must be scanned like any other created one, not deregistered. Only the
    /// source side (`From`, or an unqualified rename) leaves the tree.
    pub fn from_event_kind(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => ChangeKind::Create,
            EventKind::Remove(_) => ChangeKind::Remove,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Create,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
            EventKind::Modify(_) => ChangeKind::Modify,
            _ => ChangeKind::Other,
        }
    }
}

/// One debounce window's worth of filesystem changes.
///
/// Maps each changed path to the *latest* change kind observed for it within
/// the window. Merging is last-write-wins per path, so replaying the same
/// event twice yields a single entry. A batch is created when the first raw
/// event of a window arrives, grows until the window closes, is consumed
/// exactly once, and then discarded.
#[derive(Debug, Default)]
pub struct ChangeBatch {
    changes: HashMap<PathBuf, ChangeKind>,
}

impl ChangeBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change for a single path, overwriting any earlier kind.
    pub fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        self.changes.insert(path, kind);
    }

    /// Merge every path of a raw notify event into the batch.
    ///
    /// A paired rename (`RenameMode::Both`) carries `[source, destination]`:
    /// the source leaves the tree and the destination enters it, so the two
    /// paths get different kinds.
    pub fn merge_event(&mut self, event: &Event) {
        if event.kind == EventKind::Modify(ModifyKind::Name(RenameMode::Both)) {
            let mut paths = event.paths.iter();
            if let Some(from) = paths.next() {
                debug!(path = ?from, "merging rename source into batch");
                self.record(from.clone(), ChangeKind::Rename);
            }
            for to in paths {
                debug!(path = ?to, "merging rename destination into batch");
                self.record(to.clone(), ChangeKind::Create);
            }
            return;
        }

        let kind = ChangeKind::from_event_kind(&event.kind);
        for path in &event.paths {
            debug!(path = ?path, ?kind, "merging change into batch");
            self.record(path.clone(), kind);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Latest recorded kind for a path, if any.
    pub fn kind_of(&self, path: &Path) -> Option<ChangeKind> {
        self.changes.get(path).copied()
    }

    /// Iterate over `(path, kind)` pairs. Order is unspecified; the batch is
    /// consumed as a logical OR, so consumers must not depend on it.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &ChangeKind)> {
        self.changes.iter()
    }

    /// Iterate over changed paths only.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.changes.keys()
    }
}
