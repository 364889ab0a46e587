//! Immediate (non-recursive) directory listing.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use dirmirror_core::{io_err, DirectoryEntry, SyncError};

/// Files and subdirectories directly under one directory, each sorted by
/// name so log output is reproducible across platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub files: Vec<OsString>,
    pub dirs: Vec<OsString>,
}

impl Listing {
    pub fn entries(&self) -> impl Iterator<Item = DirectoryEntry> + '_ {
        self.files
            .iter()
            .map(|n| DirectoryEntry::file(n.clone()))
            .chain(self.dirs.iter().map(|n| DirectoryEntry::directory(n.clone())))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}

/// List `dir`. Symlinks are followed; anything that does not resolve to a
/// regular file or a directory is left out.
///
/// Failing to open or iterate the directory is an error. An entry that
/// disappears between `read_dir` and `stat` is dropped with a debug line.
pub fn list_dir(dir: &Path) -> Result<Listing, SyncError> {
    let mut listing = Listing::default();
    let read = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in read {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => listing.files.push(entry.file_name()),
            Ok(meta) if meta.is_dir() => listing.dirs.push(entry.file_name()),
            Ok(_) => tracing::debug!("ignoring special entry '{}'", path.display()),
            Err(err) => {
                tracing::debug!("ignoring unreadable entry '{}': {err}", path.display())
            }
        }
    }
    listing.files.sort();
    listing.dirs.sort();
    Ok(listing)
}

/// Comma-separated names for debug lines, or `empty` when there are none.
pub(crate) fn join_names(names: &[OsString], empty: &str) -> String {
    if names.is_empty() {
        return empty.to_string();
    }
    names
        .iter()
        .map(|n| n.to_string_lossy())
        .collect::<Vec<_>>()
        .join(", ")
}
