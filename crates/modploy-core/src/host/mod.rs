//! Host module runtime seam
//!
//! The host runtime owns the module lifecycle. This crate only decides which
//! call to make; the host performs it.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::location::LocationId;

pub use memory::{HostEvent, MemoryHost};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid module content for {location}: {reason}")]
    InvalidContent { location: String, reason: String },
    #[error("failed to start module {location}: {reason}")]
    StartFailed { location: String, reason: String },
    #[error("failed to stop module {location}: {reason}")]
    StopFailed { location: String, reason: String },
    #[error("host runtime is shutting down")]
    ShuttingDown,
}

/// Handle to a module installed in the host runtime
pub trait ModuleHandle: Send + Sync + fmt::Debug {
    fn location(&self) -> &LocationId;

    /// Symbolic name of the currently installed content
    fn symbolic_name(&self) -> Option<String>;

    fn start(&self) -> Result<(), HostError>;

    fn stop(&self) -> Result<(), HostError>;

    /// Replace the module's content
    fn update(&self, content: Vec<u8>) -> Result<(), HostError>;
}

pub type ModuleRef = Arc<dyn ModuleHandle>;

/// The host module runtime
pub trait HostRuntime: Send + Sync {
    /// Install content under a location identity
    fn install(&self, location: &LocationId, content: Vec<u8>) -> Result<ModuleRef, HostError>;

    /// Find the module installed under a location identity
    fn lookup(&self, location: &LocationId) -> Option<ModuleRef>;

    /// Terminate the host runtime itself. Irreversible.
    fn stop_host(&self) -> Result<(), HostError>;
}
