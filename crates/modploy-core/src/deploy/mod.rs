//! Deployment sequencing
//!
//! Runtime directories are installed and started first, then application
//! directories. Watches on application directories are registered during
//! the application pass and only started once every directory has been
//! scanned, so no watch batch races the bulk scan.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::DeployConfig;
use crate::host::HostRuntime;
use crate::install::ModuleInstaller;
use crate::watch::{DirWatcher, WatchBridge};

/// Outcome of [`Deployer::start`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploySummary {
    /// Modules installed or updated from runtime directories
    pub runtime_modules: usize,
    /// Modules installed or updated from application directories
    pub application_modules: usize,
    /// Modules that started successfully
    pub started: usize,
    /// Directories under active watch
    pub watched_dirs: usize,
    /// A host stop was requested during the scan
    pub halted: bool,
}

#[derive(Debug)]
pub struct Deployer {
    config: DeployConfig,
    installer: Arc<ModuleInstaller>,
    watchers: BTreeMap<PathBuf, DirWatcher>,
    started: bool,
}

impl Deployer {
    pub fn new(config: DeployConfig, host: Arc<dyn HostRuntime>) -> Self {
        let installer = Arc::new(ModuleInstaller::new(host, config.archive_extension.clone()));
        Self {
            config,
            installer,
            watchers: BTreeMap::new(),
            started: false,
        }
    }

    /// Directories with a registered watch
    pub fn watched_dirs(&self) -> impl Iterator<Item = &Path> {
        self.watchers.keys().map(PathBuf::as_path)
    }

    /// Number of watches currently running
    pub fn active_watches(&self) -> usize {
        self.watchers.values().filter(|w| w.is_running()).count()
    }

    /// Deploy every configured directory and start watching
    ///
    /// Failures are logged and absorbed; nothing aborts the sequence except
    /// a host stop request. Watching requires a tokio runtime. Runs once.
    pub fn start(&mut self) -> DeploySummary {
        let mut summary = DeploySummary::default();
        if self.started {
            tracing::warn!("Deployment already started");
            return summary;
        }
        self.started = true;

        tracing::info!(
            "Installing runtime modules from {}",
            join_dirs(&self.config.runtime_dirs)
        );
        for dir in &self.config.runtime_dirs {
            let modules = self.installer.install_directory(dir);
            summary.runtime_modules += modules.len();
            summary.started += self.installer.start_modules(&modules);
            if self.installer.is_halted() {
                summary.halted = true;
                return summary;
            }
        }

        tracing::info!(
            "Installing application modules from {}",
            join_dirs(&self.config.application_dirs)
        );
        for dir in &self.config.application_dirs {
            let modules = self.installer.install_directory(dir);
            summary.application_modules += modules.len();
            summary.started += self.installer.start_modules(&modules);
            if self.installer.is_halted() {
                summary.halted = true;
                return summary;
            }

            if self.config.watch_application_dirs {
                let bridge = Arc::new(WatchBridge::new(dir.clone(), Arc::clone(&self.installer)));
                let watcher = DirWatcher::new(dir.clone(), self.config.quiet_period(), bridge);
                self.watchers.insert(dir.clone(), watcher);
            }
        }

        for (dir, watcher) in &mut self.watchers {
            match watcher.start() {
                Ok(()) => summary.watched_dirs += 1,
                Err(e) => tracing::error!(
                    dir = %dir.display(),
                    error = %e,
                    "Couldn't start directory watch"
                ),
            }
        }

        tracing::info!(
            runtime_modules = summary.runtime_modules,
            application_modules = summary.application_modules,
            started = summary.started,
            watched_dirs = summary.watched_dirs,
            "Deployment started"
        );
        summary
    }

    /// Release classifier resources and stop every watch
    ///
    /// A batch in progress finishes before its watch stops.
    pub async fn stop(&mut self) {
        self.installer.dispose();
        for watcher in self.watchers.values_mut() {
            watcher.stop().await;
        }
        tracing::info!("Deployment stopped");
    }
}

fn join_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "(none)".to_string();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
