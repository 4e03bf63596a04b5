//! Location identities
//!
//! A location identity is the key the host runtime uses to recognize a
//! module: `symbolicName[:version]` for modules, the raw file name for plain
//! archives.

use std::fmt;

use crate::archive::ArchiveMetadata;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the location identity of an archive
///
/// Plain archives fall back to their file name, so two plain archives with
/// the same name in different directories share one identity.
pub fn resolve_location(metadata: &ArchiveMetadata, fallback_name: &str) -> LocationId {
    match &metadata.symbolic_name {
        Some(name) => match &metadata.version {
            Some(version) => LocationId(format!("{}:{}", name, version)),
            None => LocationId(name.clone()),
        },
        None => LocationId(fallback_name.to_string()),
    }
}

/// Normalize a raw symbolic-name header
///
/// Drops directives after `;` and characters outside `[A-Za-z0-9._-]`.
/// Returns `None` when nothing usable remains.
pub fn normalize_symbolic_name(raw: &str) -> Option<String> {
    let base = raw.split(';').next().unwrap_or(raw).trim();
    let name: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if name.is_empty() { None } else { Some(name) }
}
