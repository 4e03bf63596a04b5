//! Debounced directory watcher
//!
//! Raw notifications from `notify` are forwarded to a tokio task that
//! coalesces them until the tree has been quiet for the configured period,
//! then hands the batch to a [`ChangeListener`] on the blocking pool.
//! Batches for one watcher never overlap. A created path that was already
//! present before the batch is reported as updated.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{ChangeListener, KnownFiles, PendingChanges, WatchError};

type RawEvent = notify::Result<notify::Event>;

pub struct DirWatcher {
    root: PathBuf,
    quiet_period: Duration,
    listener: Arc<dyn ChangeListener>,
    running: Option<Running>,
}

struct Running {
    // Dropping the watcher ends the notification stream
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for DirWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirWatcher")
            .field("root", &self.root)
            .field("quiet_period", &self.quiet_period)
            .field("running", &self.is_running())
            .finish()
    }
}

impl DirWatcher {
    pub fn new(root: PathBuf, quiet_period: Duration, listener: Arc<dyn ChangeListener>) -> Self {
        Self {
            root,
            quiet_period,
            listener,
            running: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Begin watching
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.running.is_some() {
            return Err(WatchError::AlreadyStarted(self.root.clone()));
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| WatchError::NoRuntime(self.root.clone()))?;

        let (tx, rx) = mpsc::unbounded_channel::<RawEvent>();
        let mut watcher = notify::recommended_watcher(move |event: RawEvent| {
            // Receiver gone means the watcher is shutting down
            let _ = tx.send(event);
        })
        .map_err(|source| WatchError::Notify {
            path: self.root.clone(),
            source,
        })?;
        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: self.root.clone(),
                source,
            })?;
        let known = KnownFiles::scan(&self.root);
        let known_count = known.len();

        let cancel = CancellationToken::new();
        let task = runtime.spawn(run_loop(
            rx,
            known,
            self.root.clone(),
            self.quiet_period,
            Arc::clone(&self.listener),
            cancel.clone(),
        ));

        tracing::info!(
            root = %self.root.display(),
            quiet_period_ms = self.quiet_period.as_millis() as u64,
            known_files = known_count,
            "Watching directory"
        );
        self.running = Some(Running {
            _watcher: watcher,
            cancel,
            task,
        });
        Ok(())
    }

    /// Stop watching
    ///
    /// A batch already being dispatched runs to completion first. Pending,
    /// not yet flushed changes are dropped.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.cancel.cancel();
        drop(running._watcher);
        if let Err(e) = running.task.await {
            tracing::error!(root = %self.root.display(), error = %e, "Watch task failed");
        }
        tracing::info!(root = %self.root.display(), "Stopped watching directory");
    }
}

async fn run_loop(
    mut rx: mpsc::UnboundedReceiver<RawEvent>,
    mut known: KnownFiles,
    root: PathBuf,
    quiet_period: Duration,
    listener: Arc<dyn ChangeListener>,
    cancel: CancellationToken,
) {
    let mut pending = PendingChanges::new();

    loop {
        let next = if pending.is_empty() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => event,
            }
        } else {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = tokio::time::timeout(quiet_period, rx.recv()) => match event {
                    Ok(event) => event,
                    Err(_) => {
                        flush(&mut pending, &mut known, &root, &listener).await;
                        continue;
                    }
                },
            }
        };

        match next {
            Some(Ok(event)) => pending.record_event(&root, &event),
            Some(Err(e)) => {
                tracing::warn!(root = %root.display(), error = %e, "File watch error");
            }
            None => break,
        }
    }
}

async fn flush(
    pending: &mut PendingChanges,
    known: &mut KnownFiles,
    root: &Path,
    listener: &Arc<dyn ChangeListener>,
) {
    let mut batch = pending.drain();
    batch.reconcile_with_filesystem();
    if batch.is_empty() {
        return;
    }
    known.promote_replaced(&mut batch);
    known.apply(&batch);

    tracing::debug!(
        root = %root.display(),
        created = batch.created.len(),
        updated = batch.updated.len(),
        deleted = batch.deleted.len(),
        "Dispatching change batch"
    );

    let listener = Arc::clone(listener);
    let result = tokio::task::spawn_blocking(move || batch.dispatch(listener.as_ref())).await;
    if let Err(e) = result {
        tracing::error!(root = %root.display(), error = %e, "Change batch handler failed");
    }
}
