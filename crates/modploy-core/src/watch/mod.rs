//! Incremental deployment from file-system changes
//!
//! - `dir_watcher`: debounced, batched notifications for one directory tree
//! - `batch`: per-path coalescing of raw events into created/updated/deleted,
//!   and the set of files known to be present
//! - `bridge`: feeds change batches back into the install path

pub mod batch;
pub mod bridge;
pub mod dir_watcher;

use std::path::PathBuf;

use thiserror::Error;

pub use batch::{ChangeBatch, ChangeKind, KnownFiles, PendingChanges};
pub use bridge::WatchBridge;
pub use dir_watcher::DirWatcher;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watching {0} requires a running tokio runtime")]
    NoRuntime(PathBuf),
    #[error("already watching {0}")]
    AlreadyStarted(PathBuf),
}

/// Receives debounced change batches for a watched directory
///
/// Each callback gets every path of its kind changed since the previous
/// quiet period. Order within a batch is not significant.
pub trait ChangeListener: Send + Sync {
    fn files_created(&self, paths: &[PathBuf]);

    fn files_updated(&self, paths: &[PathBuf]);

    fn files_deleted(&self, paths: &[PathBuf]);
}
