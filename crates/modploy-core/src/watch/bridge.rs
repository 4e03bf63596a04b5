//! Bridge from change batches to the install path

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ChangeListener;
use crate::host::ModuleRef;
use crate::install::ModuleInstaller;

/// Re-runs classification for paths changed in one watched directory
#[derive(Debug, Clone)]
pub struct WatchBridge {
    dir: PathBuf,
    installer: Arc<ModuleInstaller>,
}

impl WatchBridge {
    pub fn new(dir: PathBuf, installer: Arc<ModuleInstaller>) -> Self {
        Self { dir, installer }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Walk directories, install archive files; non-archive files are ignored
    fn install_paths(&self, paths: &[PathBuf], known_path: bool) -> Vec<ModuleRef> {
        let mut modules = Vec::new();
        for path in paths {
            if self.installer.is_halted() {
                break;
            }
            if path.is_dir() {
                modules.extend(self.installer.install_directory(path));
            } else if self.installer.is_archive(path) {
                modules.extend(self.installer.install_or_update(path, known_path));
            } else {
                tracing::debug!(path = %path.display(), "Ignoring non-archive file");
            }
        }
        modules
    }
}

impl ChangeListener for WatchBridge {
    fn files_created(&self, paths: &[PathBuf]) {
        let modules = self.install_paths(paths, false);
        self.installer.start_modules(&modules);
    }

    fn files_updated(&self, paths: &[PathBuf]) {
        // Updated modules were restarted already; starting them again is a no-op
        let modules = self.install_paths(paths, true);
        self.installer.start_modules(&modules);
    }

    fn files_deleted(&self, paths: &[PathBuf]) {
        tracing::debug!(
            dir = %self.dir.display(),
            count = paths.len(),
            "Ignoring deleted files"
        );
    }
}
