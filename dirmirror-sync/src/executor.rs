//! Applies classified actions to the replica.
//!
//! Every action is isolated: a failure is logged, reported as
//! [`ActionOutcome::Failed`] and the loop moves on to the next action.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use filetime::FileTime;

use dirmirror_core::{io_err, ActionKind, FileAction, SyncError};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of executing one [`FileAction`].
#[derive(Debug)]
pub enum ActionOutcome {
    Copied { name: OsString },
    Updated { name: OsString },
    Deleted { name: OsString },
    /// Nothing to execute.
    Skipped { name: OsString },
    /// Dry run: the file would have been copied.
    WouldCopy { name: OsString },
    /// Dry run: the file would have been updated.
    WouldUpdate { name: OsString },
    /// Dry run: the file would have been deleted.
    WouldDelete { name: OsString },
    Failed { name: OsString, error: SyncError },
}

/// Result of removing one replica-only subdirectory.
#[derive(Debug)]
pub enum DirOutcome {
    Removed { name: OsString },
    WouldRemove { name: OsString },
    Failed { name: OsString, error: SyncError },
}

// ---------------------------------------------------------------------------
// File actions
// ---------------------------------------------------------------------------

/// Execute `actions` against `replica_dir`, reading from `source_dir`.
pub fn execute(
    actions: &[FileAction],
    source_dir: &Path,
    replica_dir: &Path,
    dry_run: bool,
) -> Vec<ActionOutcome> {
    actions
        .iter()
        .map(|action| execute_one(action, source_dir, replica_dir, dry_run))
        .collect()
}

fn execute_one(
    action: &FileAction,
    source_dir: &Path,
    replica_dir: &Path,
    dry_run: bool,
) -> ActionOutcome {
    let name = action.name.clone();
    let shown = action.display_name();
    let source_path = source_dir.join(&action.name);
    let replica_path = replica_dir.join(&action.name);

    match action.kind {
        ActionKind::Skip => ActionOutcome::Skipped { name },
        kind @ (ActionKind::Copy | ActionKind::Update { .. }) if dry_run => {
            if kind == ActionKind::Copy {
                tracing::info!("[DRY RUN] Would copy: '{shown}'");
                ActionOutcome::WouldCopy { name }
            } else {
                tracing::info!("[DRY RUN] Would update: '{shown}'");
                ActionOutcome::WouldUpdate { name }
            }
        }
        kind @ (ActionKind::Copy | ActionKind::Update { .. }) => {
            let transferred = copy_contents(&source_path, &replica_path)
                .map(|meta| apply_metadata(&replica_path, &meta));
            transfer_outcome(name, &shown, kind, transferred)
        }
        ActionKind::Delete if dry_run => {
            tracing::info!("[DRY RUN] Would delete: '{shown}'");
            ActionOutcome::WouldDelete { name }
        }
        ActionKind::Delete => match fs::remove_file(&replica_path) {
            Ok(()) => {
                tracing::info!("Deleted: '{shown}'");
                ActionOutcome::Deleted { name }
            }
            Err(e) => {
                let error = io_err(&replica_path, e);
                tracing::error!("Failed to delete file '{shown}': {error}");
                tracing::warn!("File '{shown}' will be skipped (error)");
                ActionOutcome::Failed { name, error }
            }
        },
    }
}

/// Turn the result of a transfer into an outcome and log it.
///
/// The outer result is the content copy, the inner one the metadata. Once
/// the bytes are in place the file counts as transferred; a metadata
/// failure only gets a warning.
fn transfer_outcome(
    name: OsString,
    shown: &str,
    kind: ActionKind,
    transferred: Result<Result<(), SyncError>, SyncError>,
) -> ActionOutcome {
    let metadata = match transferred {
        Ok(metadata) => metadata,
        Err(error) => {
            tracing::error!("Failed to copy/update file '{shown}': {error}");
            tracing::warn!("File '{shown}' will be skipped (error)");
            return ActionOutcome::Failed { name, error };
        }
    };
    if let Err(error) = metadata {
        tracing::warn!("Timestamps or attributes of '{shown}' were not replicated: {error}");
    }
    if kind == ActionKind::Copy {
        tracing::info!("Copied: '{shown}'");
        ActionOutcome::Copied { name }
    } else {
        tracing::info!("Updated: '{shown}'");
        ActionOutcome::Updated { name }
    }
}

/// Copy the bytes of `src` over `dst` and return the source metadata.
///
/// Errors reading the source carry `src`; everything after the source was
/// found carries `dst`.
pub fn copy_contents(src: &Path, dst: &Path) -> Result<fs::Metadata, SyncError> {
    let meta = fs::metadata(src).map_err(|e| io_err(src, e))?;
    if dst.is_file() {
        clear_readonly(dst).map_err(|e| io_err(dst, e))?;
    }
    fs::copy(src, dst).map_err(|e| io_err(dst, e))?;
    Ok(meta)
}

/// Replicate modification/access time, creation time (Windows only), and
/// permissions from `meta` onto `dst`.
pub fn apply_metadata(dst: &Path, meta: &fs::Metadata) -> Result<(), SyncError> {
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(meta),
        FileTime::from_last_modification_time(meta),
    )
    .map_err(|e| io_err(dst, e))?;
    #[cfg(windows)]
    copy_creation_time(dst, meta).map_err(|e| io_err(dst, e))?;
    fs::set_permissions(dst, meta.permissions()).map_err(|e| io_err(dst, e))
}

#[cfg(windows)]
fn copy_creation_time(dst: &Path, meta: &fs::Metadata) -> io::Result<()> {
    use std::os::windows::fs::{FileTimesExt, OpenOptionsExt};

    // FILE_WRITE_ATTRIBUTES; also works on read-only files.
    const FILE_WRITE_ATTRIBUTES: u32 = 0x0100;
    let created = meta.created()?;
    let file = fs::OpenOptions::new()
        .access_mode(FILE_WRITE_ATTRIBUTES)
        .open(dst)?;
    file.set_times(fs::FileTimes::new().set_created(created))
}

fn clear_readonly(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    if !perms.readonly() {
        return Ok(());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(path, perms)
}

// ---------------------------------------------------------------------------
// Directories
// ---------------------------------------------------------------------------

/// Create a missing replica directory and stamp it with the source
/// directory's timestamps.
pub fn create_replica_dir(source_dir: &Path, replica_dir: &Path) -> Result<(), SyncError> {
    fs::create_dir_all(replica_dir).map_err(|e| io_err(replica_dir, e))?;
    let meta = fs::metadata(source_dir).map_err(|e| io_err(source_dir, e))?;
    filetime::set_file_times(
        replica_dir,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
    .map_err(|e| io_err(replica_dir, e))
}

/// Remove each named subdirectory of `replica_dir` with its whole subtree.
///
/// A dry run reports the top-level directory only.
pub fn remove_subdirs(names: &[OsString], replica_dir: &Path, dry_run: bool) -> Vec<DirOutcome> {
    names
        .iter()
        .map(|name| {
            let path = replica_dir.join(name);
            if dry_run {
                tracing::info!("[DRY RUN] Would delete folder: '{}'", path.display());
                return DirOutcome::WouldRemove { name: name.clone() };
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    tracing::info!("Deleted folder: '{}'", path.display());
                    DirOutcome::Removed { name: name.clone() }
                }
                Err(e) => {
                    let error = io_err(&path, e);
                    tracing::error!("Failed to delete folder '{}': {error}", path.display());
                    tracing::warn!("Folder '{}' will be skipped (error)", path.display());
                    DirOutcome::Failed {
                        name: name.clone(),
                        error,
                    }
                }
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
