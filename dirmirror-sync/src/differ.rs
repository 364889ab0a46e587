//! Per-directory differencing of a source/replica pair.
//!
//! Only the immediate children of one directory pair are looked at; the
//! engine drives recursion. Every file name seen on either side ends up in
//! exactly one of `transfers`, `deletions`, `unchanged`, `failed`, or
//! `conflicts`.

use std::collections::{HashMap, HashSet};
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::Path;

use dirmirror_core::{
    io_err, ActionKind, EntryKind, FileAction, SyncError, UpdateReason,
};

use crate::comparator::files_identical;
use crate::listing::{list_dir, Listing};

/// A name that is a file on one side and a directory on the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConflict {
    pub name: OsString,
    pub source_kind: EntryKind,
    pub replica_kind: EntryKind,
}

impl TypeConflict {
    pub fn to_error(&self) -> SyncError {
        SyncError::TypeConflict {
            name: self.name.to_string_lossy().into_owned(),
            source_kind: self.source_kind,
            replica_kind: self.replica_kind,
        }
    }
}

/// Classified contents of one directory pair.
#[derive(Debug, Default)]
pub struct DirectoryDiff {
    /// `Copy` and `Update` actions, in source listing order.
    pub transfers: Vec<FileAction>,
    /// `Delete` actions, in replica listing order.
    pub deletions: Vec<FileAction>,
    /// `Skip` actions; never executed, only counted.
    pub unchanged: Vec<FileAction>,
    /// Every source subdirectory that must be visited.
    pub source_subdirs: Vec<OsString>,
    /// Replica subdirectories with no source counterpart.
    pub replica_only_subdirs: Vec<OsString>,
    pub conflicts: Vec<TypeConflict>,
    /// Common files whose comparison failed; skipped this pass.
    pub failed: Vec<(OsString, SyncError)>,
    /// Comparisons that needed a content hash.
    pub hashed: usize,
}

impl DirectoryDiff {
    pub fn count(&self, pred: impl Fn(&ActionKind) -> bool) -> usize {
        self.transfers
            .iter()
            .chain(&self.deletions)
            .chain(&self.unchanged)
            .filter(|a| pred(&a.kind))
            .count()
    }

    pub fn copies(&self) -> usize {
        self.count(|k| matches!(k, ActionKind::Copy))
    }

    pub fn updates(&self) -> usize {
        self.count(|k| matches!(k, ActionKind::Update { .. }))
    }
}

/// List both directories and classify their contents.
pub fn diff(source_dir: &Path, replica_dir: &Path) -> Result<DirectoryDiff, SyncError> {
    let source = list_dir(source_dir)?;
    let replica = list_dir(replica_dir)?;
    Ok(diff_listings(source_dir, replica_dir, &source, &replica))
}

/// Classify two listings that were already taken.
///
/// Item failures (a file vanishing between listing and stat, an unreadable
/// file during hashing) are recorded in [`DirectoryDiff::failed`] and never
/// returned as an error.
pub fn diff_listings(
    source_dir: &Path,
    replica_dir: &Path,
    source: &Listing,
    replica: &Listing,
) -> DirectoryDiff {
    let mut out = DirectoryDiff::default();

    let source_kinds: HashMap<&OsStr, EntryKind> = source
        .files
        .iter()
        .map(|n| (n.as_os_str(), EntryKind::File))
        .chain(source.dirs.iter().map(|n| (n.as_os_str(), EntryKind::Directory)))
        .collect();
    let replica_kinds: HashMap<&OsStr, EntryKind> = replica
        .files
        .iter()
        .map(|n| (n.as_os_str(), EntryKind::File))
        .chain(replica.dirs.iter().map(|n| (n.as_os_str(), EntryKind::Directory)))
        .collect();

    let mut conflicted: HashSet<&OsStr> = HashSet::new();
    for entry in source.entries() {
        let Some(&replica_kind) = replica_kinds.get(entry.name.as_os_str()) else {
            continue;
        };
        if replica_kind == entry.kind {
            continue;
        }
        let conflict = TypeConflict {
            name: entry.name.clone(),
            source_kind: entry.kind,
            replica_kind,
        };
        tracing::error!("{}", conflict.to_error());
        tracing::warn!("Entry '{}' will be skipped (error)", entry.name.to_string_lossy());
        if let Some((name, _)) = source_kinds.get_key_value(entry.name.as_os_str()) {
            conflicted.insert(*name);
        }
        out.conflicts.push(conflict);
    }

    for name in &source.files {
        if conflicted.contains(name.as_os_str()) {
            continue;
        }
        if replica_kinds.get(name.as_os_str()) != Some(&EntryKind::File) {
            out.transfers.push(FileAction::new(name.clone(), ActionKind::Copy));
            continue;
        }
        match compare_common(name, source_dir, replica_dir, &mut out.hashed) {
            Ok(ActionKind::Skip) => {
                tracing::debug!("Skipped: '{}' (no changes)", name.to_string_lossy());
                out.unchanged.push(FileAction::new(name.clone(), ActionKind::Skip));
            }
            Ok(kind) => {
                if let ActionKind::Update { reason } = &kind {
                    tracing::debug!("File '{}' {reason}", name.to_string_lossy());
                }
                out.transfers.push(FileAction::new(name.clone(), kind));
            }
            Err(err) => {
                tracing::error!("Failed to compare file: {err}");
                tracing::warn!("File '{}' will be skipped (error)", name.to_string_lossy());
                out.failed.push((name.clone(), err));
            }
        }
    }

    for name in &replica.files {
        if conflicted.contains(name.as_os_str()) || source_kinds.contains_key(name.as_os_str()) {
            continue;
        }
        out.deletions.push(FileAction::new(name.clone(), ActionKind::Delete));
    }

    out.source_subdirs = source
        .dirs
        .iter()
        .filter(|n| !conflicted.contains(n.as_os_str()))
        .cloned()
        .collect();
    out.replica_only_subdirs = replica
        .dirs
        .iter()
        .filter(|n| !conflicted.contains(n.as_os_str()) && !source_kinds.contains_key(n.as_os_str()))
        .cloned()
        .collect();

    out
}

/// Size first, then content. Only equal sizes get hashed.
fn compare_common(
    name: &OsStr,
    source_dir: &Path,
    replica_dir: &Path,
    hashed: &mut usize,
) -> Result<ActionKind, SyncError> {
    let source_path = source_dir.join(name);
    let replica_path = replica_dir.join(name);
    let source_len = fs::metadata(&source_path)
        .map_err(|e| io_err(&source_path, e))?
        .len();
    let replica_len = fs::metadata(&replica_path)
        .map_err(|e| io_err(&replica_path, e))?
        .len();

    if source_len != replica_len {
        return Ok(ActionKind::Update {
            reason: UpdateReason::SizeDiffers {
                source: source_len,
                replica: replica_len,
            },
        });
    }

    *hashed += 1;
    if files_identical(&source_path, &replica_path)? {
        Ok(ActionKind::Skip)
    } else {
        Ok(ActionKind::Update {
            reason: UpdateReason::ContentDiffers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Pair {
        _tmp: TempDir,
        source: std::path::PathBuf,
        replica: std::path::PathBuf,
    }

    fn pair() -> Pair {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        let replica = tmp.path().join("replica");
        fs::create_dir(&source).unwrap();
        fs::create_dir(&replica).unwrap();
        Pair {
            _tmp: tmp,
            source,
            replica,
        }
    }

    fn names(actions: &[FileAction]) -> Vec<String> {
        actions.iter().map(|a| a.display_name().into_owned()).collect()
    }

    #[test]
    fn empty_directories_yield_nothing() {
        let p = pair();
        let d = diff(&p.source, &p.replica).unwrap();
        assert!(d.transfers.is_empty());
        assert!(d.deletions.is_empty());
        assert!(d.unchanged.is_empty());
        assert!(d.source_subdirs.is_empty());
        assert!(d.replica_only_subdirs.is_empty());
    }

    #[test]
    fn classifies_copy_update_delete_and_subdirs() {
        let p = pair();
        fs::write(p.source.join("a.txt"), "0123456789").unwrap();
        fs::write(p.source.join("b.txt"), "hello").unwrap();
        fs::create_dir(p.source.join("sub")).unwrap();
        fs::write(p.replica.join("b.txt"), "jello").unwrap();
        fs::write(p.replica.join("c.txt"), "stale").unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(names(&d.transfers), vec!["a.txt", "b.txt"]);
        assert_eq!(d.transfers[0].kind, ActionKind::Copy);
        assert_eq!(
            d.transfers[1].kind,
            ActionKind::Update {
                reason: UpdateReason::ContentDiffers
            }
        );
        assert_eq!(names(&d.deletions), vec!["c.txt"]);
        assert_eq!(d.source_subdirs, vec![OsString::from("sub")]);
        assert!(d.replica_only_subdirs.is_empty());
        assert_eq!(d.copies(), 1);
        assert_eq!(d.updates(), 1);
    }

    #[test]
    fn size_mismatch_short_circuits_hashing() {
        let p = pair();
        fs::write(p.source.join("f"), "longer content").unwrap();
        fs::write(p.replica.join("f"), "short").unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(d.hashed, 0, "size mismatch must not hash");
        assert_eq!(
            d.transfers[0].kind,
            ActionKind::Update {
                reason: UpdateReason::SizeDiffers {
                    source: 14,
                    replica: 5
                }
            }
        );
    }

    #[test]
    fn identical_files_are_skipped_after_hashing() {
        let p = pair();
        fs::write(p.source.join("same"), "payload").unwrap();
        fs::write(p.replica.join("same"), "payload").unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(d.hashed, 1);
        assert!(d.transfers.is_empty());
        assert_eq!(names(&d.unchanged), vec!["same"]);
    }

    #[test]
    fn every_source_subdir_is_visited_and_extras_are_pruned() {
        let p = pair();
        fs::create_dir(p.source.join("common")).unwrap();
        fs::create_dir(p.source.join("fresh")).unwrap();
        fs::create_dir(p.replica.join("common")).unwrap();
        fs::create_dir(p.replica.join("orphan")).unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(
            d.source_subdirs,
            vec![OsString::from("common"), OsString::from("fresh")]
        );
        assert_eq!(d.replica_only_subdirs, vec![OsString::from("orphan")]);
    }

    #[test]
    fn file_in_source_directory_in_replica_is_a_conflict() {
        let p = pair();
        fs::write(p.source.join("data"), "file").unwrap();
        fs::create_dir(p.replica.join("data")).unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(d.conflicts.len(), 1);
        assert_eq!(d.conflicts[0].source_kind, EntryKind::File);
        assert_eq!(d.conflicts[0].replica_kind, EntryKind::Directory);
        assert!(d.transfers.is_empty(), "no copy over a directory");
        assert!(d.replica_only_subdirs.is_empty(), "no delete of the directory");
    }

    #[test]
    fn directory_in_source_file_in_replica_is_a_conflict() {
        let p = pair();
        fs::create_dir(p.source.join("data")).unwrap();
        fs::write(p.replica.join("data"), "file").unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        assert_eq!(d.conflicts.len(), 1);
        assert!(matches!(d.conflicts[0].to_error(), SyncError::TypeConflict { .. }));
        assert!(d.deletions.is_empty(), "no delete of the file");
        assert!(d.source_subdirs.is_empty(), "no recursion into the conflict");
    }

    #[test]
    fn vanished_file_is_recorded_as_failed_and_others_continue() {
        let p = pair();
        fs::write(p.source.join("ok.txt"), "ok").unwrap();
        let source = Listing {
            files: vec![OsString::from("ghost.txt"), OsString::from("ok.txt")],
            dirs: vec![],
        };
        let replica = Listing {
            files: vec![OsString::from("ghost.txt")],
            dirs: vec![],
        };

        let d = diff_listings(&p.source, &p.replica, &source, &replica);
        assert_eq!(d.failed.len(), 1);
        assert_eq!(d.failed[0].0, OsString::from("ghost.txt"));
        assert!(matches!(d.failed[0].1, SyncError::PathNotFound { .. }));
        assert_eq!(names(&d.transfers), vec!["ok.txt"]);
    }

    #[test]
    fn every_name_maps_to_exactly_one_bucket() {
        let p = pair();
        for name in ["new", "same", "changed"] {
            fs::write(p.source.join(name), name).unwrap();
        }
        fs::write(p.replica.join("same"), "same").unwrap();
        fs::write(p.replica.join("changed"), "CHANGED").unwrap();
        fs::write(p.replica.join("old"), "old").unwrap();

        let d = diff(&p.source, &p.replica).unwrap();
        let mut all: Vec<String> = names(&d.transfers);
        all.extend(names(&d.deletions));
        all.extend(names(&d.unchanged));
        all.sort();
        assert_eq!(all, vec!["changed", "new", "old", "same"]);
    }
}
