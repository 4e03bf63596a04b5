//! Single-artifact install path and directory walks
//!
//! [`ModuleInstaller`] opens an archive, resolves its location identity,
//! classifies it and performs the resulting host runtime call. Failures are
//! logged and absorbed per artifact.

pub mod locks;
pub mod walker;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::archive::{self, Archive};
use crate::classify::{Action, Classifier};
use crate::error::DeployError;
use crate::host::{HostRuntime, ModuleRef};
use crate::location::{LocationId, resolve_location};

pub use locks::LocationLocks;

pub const DEFAULT_ARCHIVE_EXTENSION: &str = "jar";

pub struct ModuleInstaller {
    host: Arc<dyn HostRuntime>,
    classifier: Classifier,
    locks: LocationLocks,
    extension: String,
    halted: AtomicBool,
}

impl std::fmt::Debug for ModuleInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleInstaller")
            .field("classifier", &self.classifier)
            .field("extension", &self.extension)
            .field("halted", &self.is_halted())
            .finish()
    }
}

impl ModuleInstaller {
    pub fn new(host: Arc<dyn HostRuntime>, extension: impl Into<String>) -> Self {
        Self {
            classifier: Classifier::new(Arc::clone(&host)),
            host,
            locks: LocationLocks::new(),
            extension: extension.into(),
            halted: AtomicBool::new(false),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// True for files carrying the archive extension
    pub fn is_archive(&self, path: &Path) -> bool {
        archive::has_extension(path, &self.extension)
    }

    /// True once a host stop has been requested; nothing is installed after
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Release classifier resources
    pub fn dispose(&self) {
        self.classifier.dispose();
    }

    /// Install, update or wrap a single archive
    ///
    /// Returns the module handle when the host installed or updated
    /// something, `None` when no action was needed or the action failed.
    pub fn install_or_update(&self, path: &Path, known_path: bool) -> Option<ModuleRef> {
        if self.is_halted() {
            tracing::debug!(path = %path.display(), "Host stop requested, skipping archive");
            return None;
        }

        let archive = match Archive::open(path) {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to open archive");
                return None;
            }
        };
        let location = resolve_location(&archive.metadata(), &archive.file_name());

        self.locks.with_lock(&location, || {
            match self.apply(archive, &location, known_path) {
                Ok(module) => module,
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        %location,
                        error = %e,
                        "Failed to install or update archive"
                    );
                    None
                }
            }
        })
    }

    fn apply(
        &self,
        archive: Archive,
        location: &LocationId,
        known_path: bool,
    ) -> Result<Option<ModuleRef>, DeployError> {
        let action = self
            .classifier
            .classify(&archive.metadata(), location, known_path);
        tracing::debug!(
            path = %archive.path().display(),
            %location,
            %action,
            known_path,
            "Classified archive"
        );

        match action {
            Action::None => Ok(None),
            Action::Install => {
                tracing::info!("Installing module {}", location);
                let module = self.host.install(location, archive.into_bytes())?;
                Ok(Some(module))
            }
            Action::Update => self.update(location, archive),
            Action::WrapAndInstall => {
                tracing::info!("Wrapping archive {}", location);
                let wrapped = archive::wrap_archive(archive.bytes(), location.as_str())?;
                let module = self.host.install(location, wrapped)?;
                Ok(Some(module))
            }
            Action::StopFramework => {
                tracing::info!(path = %archive.path().display(), "Stopping the host runtime");
                self.halted.store(true, Ordering::SeqCst);
                self.host.stop_host()?;
                Ok(None)
            }
        }
    }

    /// Stop, replace and restart the module at `location`
    ///
    /// The first failing step aborts the sequence.
    fn update(
        &self,
        location: &LocationId,
        archive: Archive,
    ) -> Result<Option<ModuleRef>, DeployError> {
        let Some(module) = self.host.lookup(location) else {
            tracing::warn!("Not updating module {}: no longer present", location);
            return Ok(None);
        };

        tracing::info!("Updating module {}", location);
        module.stop()?;
        module.update(archive.into_bytes())?;
        module.start()?;
        Ok(Some(module))
    }

    /// Start every module, logging failures
    ///
    /// Returns the number of modules that started. Nothing is started once a
    /// host stop has been requested.
    pub fn start_modules(&self, modules: &[ModuleRef]) -> usize {
        if self.is_halted() {
            if !modules.is_empty() {
                tracing::debug!(count = modules.len(), "Host stop requested, not starting modules");
            }
            return 0;
        }

        let mut started = 0;
        for module in modules {
            match module.start() {
                Ok(()) => started += 1,
                Err(e) => tracing::error!(
                    location = %module.location(),
                    error = %e,
                    "Couldn't start module"
                ),
            }
        }
        started
    }
}
