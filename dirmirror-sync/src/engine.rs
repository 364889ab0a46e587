//! One full recursive synchronization pass.
//!
//! ## Per-directory sequence
//!
//! 1. Ensure the replica directory exists (create + stamp timestamps).
//! 2. List both sides and diff the files.
//! 3. Copy/update, then delete files.
//! 4. Delete replica-only subdirectories (whole subtree).
//! 5. Recurse into every source subdirectory, depth-first.
//!
//! The root pair goes through exactly the same sequence as any child pair.

use std::path::Path;
use std::time::Instant;

use dirmirror_core::{SyncError, SyncResult};

use crate::differ::{diff_listings, DirectoryDiff};
use crate::executor::{self, ActionOutcome, DirOutcome};
use crate::listing::{join_names, list_dir, Listing};

/// Mirrors a source tree onto a replica tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncEngine {
    dry_run: bool,
}

impl SyncEngine {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Run one pass from `source` onto `replica`.
    ///
    /// Never fails: every error is logged, counted in
    /// [`SyncResult::errored`], and confined to the item or directory it
    /// happened in.
    pub fn synchronize(&self, source: &Path, replica: &Path) -> SyncResult {
        let started = Instant::now();
        let mut result = SyncResult::new(self.dry_run);
        self.sync_dir(source, replica, &mut result);
        result.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        result
    }

    fn sync_dir(&self, source: &Path, replica: &Path, result: &mut SyncResult) {
        tracing::info!("Synchronizing folder: '{}'", source.display());
        tracing::info!("To folder: '{}'", replica.display());
        result.visited.push(source.to_path_buf());

        if let Err(err) = self.sync_dir_inner(source, replica, result) {
            tracing::error!("Failed to perform operation: {err}");
            tracing::warn!("Folder '{}' will be skipped (error)", source.display());
            result.errored += 1;
        }
    }

    fn sync_dir_inner(
        &self,
        source: &Path,
        replica: &Path,
        result: &mut SyncResult,
    ) -> Result<(), SyncError> {
        let replica_missing = !replica.exists();
        if replica_missing {
            if self.dry_run {
                tracing::info!("[DRY RUN] Would create folder: '{}'", replica.display());
            } else {
                executor::create_replica_dir(source, replica)?;
                tracing::info!("Replica folder '{}' created successfully", replica.display());
            }
            result.dirs_created += 1;
        }

        tracing::info!("Scanning source folder '{}'", source.display());
        let source_listing = list_dir(source)?;
        tracing::debug!(
            "Files in source folder: {}",
            join_names(&source_listing.files, "no files in source folder")
        );

        tracing::info!("Scanning replica folder '{}'", replica.display());
        // Only a dry run can get here with the replica still missing.
        let replica_listing = if replica_missing && self.dry_run {
            Listing::default()
        } else {
            list_dir(replica)?
        };
        tracing::debug!(
            "Files in replica folder: {}",
            join_names(&replica_listing.files, "no files in replica folder")
        );

        let diff = diff_listings(source, replica, &source_listing, &replica_listing);
        record_diff(&diff, result);
        tracing::info!(
            "Files to update: {}, to copy: {}, to delete: {}",
            diff.updates(),
            diff.copies(),
            diff.deletions.len()
        );

        for outcome in executor::execute(&diff.transfers, source, replica, self.dry_run) {
            record_action(&outcome, result);
        }
        for outcome in executor::execute(&diff.deletions, source, replica, self.dry_run) {
            record_action(&outcome, result);
        }

        tracing::debug!(
            "Subfolders in source folder: {}",
            join_names(&source_listing.dirs, "no subfolders in source folder")
        );
        tracing::debug!(
            "Subfolders in replica folder: {}",
            join_names(&replica_listing.dirs, "no subfolders in replica folder")
        );
        tracing::info!(
            "Subfolders to update: {}, to delete: {}",
            diff.source_subdirs.len(),
            diff.replica_only_subdirs.len()
        );

        for outcome in executor::remove_subdirs(&diff.replica_only_subdirs, replica, self.dry_run) {
            match outcome {
                DirOutcome::Removed { .. } | DirOutcome::WouldRemove { .. } => {
                    result.dirs_deleted += 1
                }
                DirOutcome::Failed { .. } => result.errored += 1,
            }
        }

        for name in &diff.source_subdirs {
            let replica_child = replica.join(name);
            if self.dry_run {
                tracing::info!(
                    "[DRY RUN] Would synchronize subfolder: '{}'",
                    replica_child.display()
                );
            }
            self.sync_dir(&source.join(name), &replica_child, result);
        }

        Ok(())
    }
}

fn record_diff(diff: &DirectoryDiff, result: &mut SyncResult) {
    result.skipped += diff.unchanged.len();
    result.hashed += diff.hashed;
    result.errored += diff.failed.len() + diff.conflicts.len();
}

fn record_action(outcome: &ActionOutcome, result: &mut SyncResult) {
    match outcome {
        ActionOutcome::Copied { .. } | ActionOutcome::WouldCopy { .. } => result.copied += 1,
        ActionOutcome::Updated { .. } | ActionOutcome::WouldUpdate { .. } => result.updated += 1,
        ActionOutcome::Deleted { .. } | ActionOutcome::WouldDelete { .. } => result.deleted += 1,
        ActionOutcome::Skipped { .. } => result.skipped += 1,
        ActionOutcome::Failed { .. } => result.errored += 1,
    }
}

/// Run one pass with a fresh engine.
pub fn synchronize(source: &Path, replica: &Path, dry_run: bool) -> SyncResult {
    SyncEngine::new(dry_run).synchronize(source, replica)
}
