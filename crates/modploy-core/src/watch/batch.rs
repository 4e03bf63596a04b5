//! Coalescing raw file events into change batches

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use walkdir::WalkDir;

use super::ChangeListener;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Changes accumulated during one quiet period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub created: Vec<PathBuf>,
    pub updated: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    /// Move created/updated paths that vanished before dispatch to deleted
    pub fn reconcile_with_filesystem(&mut self) {
        let (created, gone_created): (Vec<_>, Vec<_>) =
            self.created.drain(..).partition(|p| p.exists());
        let (updated, gone_updated): (Vec<_>, Vec<_>) =
            self.updated.drain(..).partition(|p| p.exists());
        self.created = created;
        self.updated = updated;
        self.deleted.extend(gone_created);
        self.deleted.extend(gone_updated);
        self.deleted.sort();
    }

    /// Hand the batch to a listener: created, then updated, then deleted
    pub fn dispatch(&self, listener: &dyn ChangeListener) {
        if !self.created.is_empty() {
            listener.files_created(&self.created);
        }
        if !self.updated.is_empty() {
            listener.files_updated(&self.updated);
        }
        if !self.deleted.is_empty() {
            listener.files_deleted(&self.deleted);
        }
    }
}

/// Per-path change state between flushes
#[derive(Debug, Default)]
pub struct PendingChanges {
    changes: BTreeMap<PathBuf, ChangeKind>,
}

impl PendingChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Merge one change into the pending state
    pub fn record(&mut self, path: PathBuf, kind: ChangeKind) {
        use ChangeKind::*;

        let merged = match (self.changes.get(&path).copied(), kind) {
            (None, kind) => Some(kind),
            (Some(Created), Deleted) => None,
            (Some(Created), _) => Some(Created),
            (Some(Deleted), Created | Updated) => Some(Updated),
            (Some(Updated), Created) => Some(Updated),
            (Some(_), kind) => Some(kind),
        };

        match merged {
            Some(kind) => {
                self.changes.insert(path, kind);
            }
            None => {
                self.changes.remove(&path);
            }
        }
    }

    /// Merge a raw notification, ignoring events on `root` itself
    pub fn record_event(&mut self, root: &Path, event: &notify::Event) {
        if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
            if let [from, to] = event.paths.as_slice() {
                self.record_unless_root(root, from, ChangeKind::Deleted);
                self.record_unless_root(root, to, ChangeKind::Created);
            }
            return;
        }

        let Some(kind) = change_kind(&event.kind) else {
            return;
        };
        for path in &event.paths {
            self.record_unless_root(root, path, kind);
        }
    }

    fn record_unless_root(&mut self, root: &Path, path: &Path, kind: ChangeKind) {
        if path != root {
            self.record(path.to_path_buf(), kind);
        }
    }

    /// Take everything recorded so far as a batch, paths sorted
    pub fn drain(&mut self) -> ChangeBatch {
        let mut batch = ChangeBatch::default();
        for (path, kind) in std::mem::take(&mut self.changes) {
            match kind {
                ChangeKind::Created => batch.created.push(path),
                ChangeKind::Updated => batch.updated.push(path),
                ChangeKind::Deleted => batch.deleted.push(path),
            }
        }
        batch
    }
}

/// Files present under a watched root as of the last flush
///
/// A created path that is already known was replaced in place, typically
/// by a rename over it. The overwritten target gets no removal event.
#[derive(Debug, Default)]
pub struct KnownFiles {
    files: BTreeSet<PathBuf>,
}

impl KnownFiles {
    /// Every file currently below `root`
    pub fn scan(root: &Path) -> Self {
        let mut known = Self::default();
        known.insert_tree(root);
        known
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Report created paths that were already present as updated
    pub fn promote_replaced(&self, batch: &mut ChangeBatch) {
        let (replaced, created): (Vec<_>, Vec<_>) = batch
            .created
            .drain(..)
            .partition(|path| self.files.contains(path));
        batch.created = created;
        if !replaced.is_empty() {
            batch.updated.extend(replaced);
            batch.updated.sort();
        }
    }

    /// Fold a batch into the known set
    pub fn apply(&mut self, batch: &ChangeBatch) {
        for path in &batch.deleted {
            self.files.retain(|known| !known.starts_with(path));
        }
        for path in batch.created.iter().chain(&batch.updated) {
            self.insert_tree(path);
        }
    }

    fn insert_tree(&mut self, path: &Path) {
        let files = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path);
        self.files.extend(files);
    }
}

/// Map a notification kind to a change, `None` for events that change no content
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Updated),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
