//! Per-artifact action classification

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::archive::ArchiveMetadata;
use crate::host::HostRuntime;
use crate::location::LocationId;

/// What to ask of the host runtime for one archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Nothing to do
    None,
    /// Install a module that is not present yet
    Install,
    /// Stop, replace and restart a present module
    Update,
    /// Synthesize module metadata for a plain archive, then install it
    WrapAndInstall,
    /// Shut down the host runtime
    StopFramework,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::None => "none",
            Action::Install => "install",
            Action::Update => "update",
            Action::WrapAndInstall => "wrap-and-install",
            Action::StopFramework => "stop-framework",
        };
        f.write_str(name)
    }
}

/// Decides the [`Action`] for an archive against the host's current state
///
/// Nothing is cached between calls: the host runtime is the only source of
/// truth for which modules are present.
pub struct Classifier {
    host: RwLock<Option<Arc<dyn HostRuntime>>>,
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Classifier {
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self {
            host: RwLock::new(Some(host)),
        }
    }

    /// Classify an archive
    ///
    /// `known_path` is true only when the path was seen before, i.e. for a
    /// watch-delivered update. A first sighting never updates a running
    /// module.
    pub fn classify(
        &self,
        metadata: &ArchiveMetadata,
        location: &LocationId,
        known_path: bool,
    ) -> Action {
        let guard = self.host.read();
        let Some(host) = guard.as_ref() else {
            tracing::debug!(%location, "Classifier disposed, skipping");
            return Action::None;
        };

        if metadata.stop_host {
            return Action::StopFramework;
        }

        let present = host.lookup(location).is_some();
        if metadata.is_module() {
            match (present, known_path) {
                (false, _) => Action::Install,
                (true, true) => Action::Update,
                (true, false) => Action::None,
            }
        } else if present {
            Action::None
        } else {
            Action::WrapAndInstall
        }
    }

    /// Release the host reference; later classifications yield `None`
    pub fn dispose(&self) {
        self.host.write().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.host.read().is_none()
    }
}
