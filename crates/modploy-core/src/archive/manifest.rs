//! Archive manifest parsing and serialization
//!
//! Reads and writes the main section of `META-INF/MANIFEST.MF`:
//! - `Name: value` headers, names compared case-insensitively
//! - Continuation lines start with a single space
//! - The main section ends at the first blank line

use thiserror::Error;

/// Path of the manifest entry inside an archive
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// Header carrying the module's symbolic name
pub const SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
/// Header carrying the module's version
pub const VERSION: &str = "Bundle-Version";
/// Header marking the manifest format of a module
pub const MODULE_MANIFEST_VERSION: &str = "Bundle-ManifestVersion";
/// Header required first in every manifest
pub const MANIFEST_VERSION: &str = "Manifest-Version";
/// Sentinel header asking the host runtime to shut down
pub const STOP_HOST: &str = "Modploy-Stop-Host";

/// Maximum line length in bytes, line terminator excluded
const MAX_LINE_BYTES: usize = 72;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("line {line}: continuation line without a preceding header")]
    OrphanContinuation { line: usize },
    #[error("line {line}: expected 'Name: value'")]
    MissingSeparator { line: usize },
    #[error("line {line}: empty header name")]
    EmptyName { line: usize },
    #[error("manifest is not valid UTF-8")]
    InvalidEncoding,
}

/// Main-section attributes of a manifest, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    attributes: Vec<(String, String)>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, ManifestError> {
        let content = std::str::from_utf8(bytes).map_err(|_| ManifestError::InvalidEncoding)?;
        Self::parse_str(content)
    }

    /// Parse the main section of a manifest
    pub fn parse_str(content: &str) -> Result<Self, ManifestError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut attributes: Vec<(String, String)> = Vec::new();

        for (idx, line) in content.split('\n').enumerate() {
            let line_num = idx + 1;
            let line = line.strip_suffix('\r').unwrap_or(line);

            if line.is_empty() {
                break;
            }

            if let Some(rest) = line.strip_prefix(' ') {
                let (_, value) = attributes
                    .last_mut()
                    .ok_or(ManifestError::OrphanContinuation { line: line_num })?;
                value.push_str(rest);
                continue;
            }

            let (name, value) = line
                .split_once(':')
                .ok_or(ManifestError::MissingSeparator { line: line_num })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ManifestError::EmptyName { line: line_num });
            }
            attributes.push((name.to_string(), value.trim_start().to_string()));
        }

        Ok(Self { attributes })
    }

    /// Look up a header value (case-insensitive name)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing an existing one in place
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Serialize the main section
    ///
    /// `Manifest-Version` is always written first. Lines longer than 72
    /// bytes are folded into continuation lines.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        let manifest_version = self.get(MANIFEST_VERSION).unwrap_or("1.0");
        write_header(&mut out, MANIFEST_VERSION, manifest_version);

        for (name, value) in self.iter() {
            if name.eq_ignore_ascii_case(MANIFEST_VERSION) {
                continue;
            }
            write_header(&mut out, name, value);
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

fn write_header(out: &mut String, name: &str, value: &str) {
    let line = format!("{}: {}", name, value);
    let mut limit = MAX_LINE_BYTES;
    let mut rest = line.as_str();

    loop {
        if rest.len() <= limit {
            out.push_str(rest);
            out.push_str("\r\n");
            return;
        }
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        out.push_str(&rest[..split]);
        out.push_str("\r\n ");
        rest = &rest[split..];
        // Continuation lines spend one byte on the leading space
        limit = MAX_LINE_BYTES - 1;
    }
}
