//! Deployment configuration
//!
//! Loaded once from `modploy.toml`, either at an explicit path or at the
//! default location under the user's config directory.

pub mod parser;
pub mod schema;

use std::path::{Path, PathBuf};

pub use parser::{parse_modploy_toml, parse_modploy_toml_str, to_toml};
pub use schema::DeployConfig;

pub const CONFIG_FILE_NAME: &str = "modploy.toml";

/// Default config file location: `<config dir>/modploy/modploy.toml`
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dir.join("modploy").join(CONFIG_FILE_NAME))
}

/// Config store for loading modploy.toml
#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
    required: bool,
}

impl ConfigStore {
    /// Store at the default location; a missing file yields the defaults
    pub fn from_default_location() -> anyhow::Result<Self> {
        Ok(Self {
            config_path: default_config_path()?,
            required: false,
        })
    }

    /// Store at an explicit path; the file must exist
    pub fn from_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            required: true,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the configuration, resolving relative directories against the
    /// config file's directory
    pub fn load(&self) -> anyhow::Result<DeployConfig> {
        if !self.config_path.exists() {
            if self.required {
                anyhow::bail!("Config file not found: {}", self.config_path.display());
            }
            tracing::debug!(
                path = %self.config_path.display(),
                "No config file, using defaults"
            );
            return Ok(DeployConfig::default());
        }

        let mut config = parse_modploy_toml(&self.config_path)?;
        if let Some(base) = self.config_path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }
}
