//! Recursive directory walk over module archives

use std::cmp::Ordering;
use std::path::Path;

use walkdir::{DirEntry, WalkDir};

use super::ModuleInstaller;
use crate::host::ModuleRef;

impl ModuleInstaller {
    /// Install every archive below `dir`
    ///
    /// Within each directory, archives are handled first in file-name order,
    /// then each subdirectory is walked in file-name order. A missing
    /// directory yields an empty result. Symbolic links are followed and
    /// directory cycles skipped.
    ///
    /// Returns the modules that were installed or updated, in walk order.
    pub fn install_directory(&self, dir: &Path) -> Vec<ModuleRef> {
        let mut modules = Vec::new();
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "Directory does not exist, nothing to install");
            return modules;
        }

        for entry in WalkDir::new(dir).follow_links(true).sort_by(archives_first) {
            if self.is_halted() {
                tracing::debug!(dir = %dir.display(), "Host stop requested, ending directory walk");
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(ancestor) = e.loop_ancestor() {
                        tracing::warn!(
                            dir = %dir.display(),
                            ancestor = %ancestor.display(),
                            "Skipping directory cycle"
                        );
                    } else {
                        tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable entry");
                    }
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.is_archive(entry.path()) {
                continue;
            }

            if let Some(module) = self.install_or_update(entry.path(), false) {
                modules.push(module);
            }
        }

        modules
    }
}

/// Files before directories, then by file name
fn archives_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}
