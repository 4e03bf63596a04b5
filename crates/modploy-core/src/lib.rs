//! Modploy Core Library
//!
//! Provides the decision-and-lifecycle engine of the module deployment
//! agent: archive inspection, location identities, action classification,
//! directory walks, incremental watches and the deployment sequence.

pub mod archive;
pub mod classify;
pub mod config;
pub mod deploy;
pub mod error;
pub mod host;
pub mod install;
pub mod location;
pub mod watch;

/// Re-exports of commonly used types
pub mod prelude {
    // Archives
    pub use crate::archive::{Archive, ArchiveMetadata};

    // Classification
    pub use crate::classify::{Action, Classifier};
    pub use crate::location::{LocationId, resolve_location};

    // Configuration
    pub use crate::config::{ConfigStore, DeployConfig};

    // Host runtime
    pub use crate::host::{HostError, HostRuntime, MemoryHost, ModuleHandle, ModuleRef};

    // Deployment
    pub use crate::deploy::{DeploySummary, Deployer};
    pub use crate::install::ModuleInstaller;

    // Watching
    pub use crate::watch::{ChangeBatch, ChangeListener, DirWatcher, WatchBridge};

    pub use crate::error::DeployError;
}
