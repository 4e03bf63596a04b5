//! Wrap plain archives into loadable modules
//!
//! Rewrites the archive with a manifest that names the module, copying every
//! other entry unchanged.

use std::io::{Cursor, Write};

use super::manifest::{self, Manifest};
use super::{ArchiveError, read_manifest};

/// Produce a module archive from a plain archive
///
/// Existing main attributes are kept; `Bundle-SymbolicName` is set to
/// `symbolic_name` and `Bundle-ManifestVersion` to `2`.
pub fn wrap_archive(bytes: &[u8], symbolic_name: &str) -> Result<Vec<u8>, ArchiveError> {
    let module_manifest = wrapped_manifest(bytes, symbolic_name);
    let mut source = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut out = zip::ZipWriter::new(Cursor::new(Vec::new()));

    out.start_file(manifest::MANIFEST_PATH, zip::write::SimpleFileOptions::default())?;
    out.write_all(&module_manifest.to_bytes())
        .map_err(ArchiveError::Write)?;

    for i in 0..source.len() {
        let entry = source.by_index_raw(i)?;
        if entry.name().eq_ignore_ascii_case(manifest::MANIFEST_PATH) {
            continue;
        }
        out.raw_copy_file(entry)?;
    }

    Ok(out.finish()?.into_inner())
}

/// Manifest that a wrapped archive will carry, without rewriting the archive
pub fn wrapped_manifest(bytes: &[u8], symbolic_name: &str) -> Manifest {
    // A broken manifest is replaced rather than carried over
    let source = read_manifest(bytes).ok().flatten().unwrap_or_default();

    let mut wrapped = Manifest::new();
    wrapped.set(
        manifest::MANIFEST_VERSION,
        source.get(manifest::MANIFEST_VERSION).unwrap_or("1.0"),
    );
    for (name, value) in source.iter() {
        wrapped.set(name, value);
    }
    wrapped.set(manifest::MODULE_MANIFEST_VERSION, "2");
    wrapped.set(manifest::SYMBOLIC_NAME, symbolic_name);
    wrapped
}
