//! Error type spanning a single deployment step.

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::host::HostError;
use crate::watch::WatchError;

/// Failure of one artifact or one watch.
///
/// These never escape the deployment sequence; they are logged at the
/// smallest scope they occur in.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}
