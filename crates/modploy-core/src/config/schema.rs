//! Configuration schema for modploy.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::install::DEFAULT_ARCHIVE_EXTENSION;

/// Deployment configuration, read once at start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Runtime-tier directories, deployed first, in order
    #[serde(default)]
    pub runtime_dirs: Vec<PathBuf>,

    /// Application-tier directories, deployed after the runtime tier
    #[serde(default)]
    pub application_dirs: Vec<PathBuf>,

    /// Watch application directories for changes after the initial scan
    #[serde(default)]
    pub watch_application_dirs: bool,

    /// Quiet period before a batch of changes is delivered
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Extension of module archives, without the leading dot
    #[serde(default = "default_archive_extension")]
    pub archive_extension: String,
}

fn default_quiet_period_ms() -> u64 {
    1500
}

fn default_archive_extension() -> String {
    DEFAULT_ARCHIVE_EXTENSION.to_string()
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            runtime_dirs: Vec::new(),
            application_dirs: Vec::new(),
            watch_application_dirs: false,
            quiet_period_ms: default_quiet_period_ms(),
            archive_extension: default_archive_extension(),
        }
    }
}

impl DeployConfig {
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.quiet_period_ms)
    }

    /// Validate and normalize the configuration
    pub fn validate(&mut self) -> anyhow::Result<()> {
        let extension = self.archive_extension.trim().trim_start_matches('.');
        if extension.is_empty() {
            anyhow::bail!("archive_extension must not be empty");
        }
        self.archive_extension = extension.to_string();

        if self.watch_application_dirs && self.quiet_period_ms == 0 {
            anyhow::bail!("quiet_period_ms must be positive when watching is enabled");
        }
        Ok(())
    }

    /// Resolve relative directories against `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for dir in self
            .runtime_dirs
            .iter_mut()
            .chain(self.application_dirs.iter_mut())
        {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}
