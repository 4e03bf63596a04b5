//! Module archives
//!
//! Opens zip archives, reads their embedded manifest and extracts the
//! identity metadata used for classification.

pub mod manifest;
pub mod wrap;

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::location::normalize_symbolic_name;

pub use manifest::{Manifest, ManifestError};
pub use wrap::wrap_archive;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("invalid manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("failed to write archive: {0}")]
    Write(#[source] std::io::Error),
}

/// Identity metadata extracted from an archive's manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveMetadata {
    /// Normalized symbolic name, absent for plain archives
    pub symbolic_name: Option<String>,
    pub version: Option<String>,
    /// The manifest asks the host runtime to shut down
    pub stop_host: bool,
}

impl ArchiveMetadata {
    pub fn from_manifest(manifest: &Manifest) -> Self {
        let symbolic_name = manifest
            .get(manifest::SYMBOLIC_NAME)
            .and_then(normalize_symbolic_name);
        let version = manifest
            .get(manifest::VERSION)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let stop_host = manifest
            .get(manifest::STOP_HOST)
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));

        Self {
            symbolic_name,
            version,
            stop_host,
        }
    }

    /// True when the archive is already a loadable module
    pub fn is_module(&self) -> bool {
        self.symbolic_name.is_some()
    }
}

/// A candidate module archive on disk
///
/// Holds the raw bytes so classification and the host install call see the
/// same content even if the file changes in between.
#[derive(Debug, Clone)]
pub struct Archive {
    path: PathBuf,
    bytes: Vec<u8>,
    manifest: Option<Manifest>,
}

impl Archive {
    /// Read an archive from disk
    ///
    /// Only an unreadable file is an error. A corrupt zip or manifest leaves
    /// the archive without metadata.
    pub fn open(path: &Path) -> Result<Self, ArchiveError> {
        let bytes = std::fs::read(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_bytes(path.to_path_buf(), bytes))
    }

    /// Build an archive from bytes already in memory
    pub fn from_bytes(path: PathBuf, bytes: Vec<u8>) -> Self {
        let manifest = match read_manifest(&bytes) {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable archive metadata"
                );
                None
            }
        };
        Self {
            path,
            bytes,
            manifest,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file name, used as the identity of plain archives
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn metadata(&self) -> ArchiveMetadata {
        self.manifest
            .as_ref()
            .map(ArchiveMetadata::from_manifest)
            .unwrap_or_default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Read the manifest of a zip archive held in memory
///
/// Returns `Ok(None)` for a valid zip without a manifest entry.
pub fn read_manifest(bytes: &[u8]) -> Result<Option<Manifest>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = match archive.by_name(manifest::MANIFEST_PATH) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| ArchiveError::Zip(e.into()))?;
    Ok(Some(Manifest::parse(&content)?))
}

/// Check whether a path carries the archive extension (case-insensitive)
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
}
