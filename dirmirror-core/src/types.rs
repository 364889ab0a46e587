//! Domain types shared by the engine, the scheduler and the CLI.
//!
//! Names inside a directory are kept as `OsString`; only the base name is
//! stored, never a joined path. All paths use `PathBuf`.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Directory listing
// ---------------------------------------------------------------------------

/// Kind of a listed entry. Anything that is neither is dropped while listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => write!(f, "file"),
            EntryKind::Directory => write!(f, "directory"),
        }
    }
}

/// One immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectoryEntry {
    pub name: OsString,
    pub kind: EntryKind,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<OsString>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

// ---------------------------------------------------------------------------
// File actions
// ---------------------------------------------------------------------------

/// Why a common file needs to be rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
    /// Byte lengths differ; content was not hashed.
    SizeDiffers { source: u64, replica: u64 },
    /// Same length, different SHA-256 digest.
    ContentDiffers,
}

impl fmt::Display for UpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateReason::SizeDiffers { source, replica } => {
                write!(f, "differs by size: source={source} bytes, replica={replica} bytes")
            }
            UpdateReason::ContentDiffers => write!(f, "differs by hash codes"),
        }
    }
}

/// What has to happen to a single file name in one directory pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Identical on both sides; nothing to execute.
    Skip,
    /// Only in source.
    Copy,
    /// On both sides with different content.
    Update { reason: UpdateReason },
    /// Only in replica.
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Skip => write!(f, "skip"),
            ActionKind::Copy => write!(f, "copy"),
            ActionKind::Update { .. } => write!(f, "update"),
            ActionKind::Delete => write!(f, "delete"),
        }
    }
}

/// A classified file name, produced once by the differ and consumed once by
/// the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAction {
    pub name: OsString,
    pub kind: ActionKind,
}

impl FileAction {
    pub fn new(name: impl Into<OsString>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Lossy display form of the name, for log lines.
    pub fn display_name(&self) -> std::borrow::Cow<'_, str> {
        self.name.to_string_lossy()
    }
}

// ---------------------------------------------------------------------------
// Pass summary
// ---------------------------------------------------------------------------

/// Counters for one synchronization pass.
///
/// In dry-run mode the counters describe what *would* have happened, so a
/// dry run and a real run over the same trees report the same numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub copied: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errored: usize,
    pub dirs_created: usize,
    pub dirs_deleted: usize,
    /// Content comparisons that had to hash both files.
    pub hashed: usize,
    /// Every source directory the pass entered, root first.
    pub visited: Vec<PathBuf>,
}

impl SyncResult {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            started_at: Utc::now(),
            duration_ms: 0,
            copied: 0,
            updated: 0,
            deleted: 0,
            skipped: 0,
            errored: 0,
            dirs_created: 0,
            dirs_deleted: 0,
            hashed: 0,
            visited: Vec::new(),
        }
    }

    /// Copies, updates and deletions, i.e. everything that mutates (or would
    /// mutate) a file.
    pub fn file_changes(&self) -> usize {
        self.copied + self.updated + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.file_changes() == 0 && self.dirs_created == 0 && self.dirs_deleted == 0
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "copied: {}, updated: {}, deleted: {}, skipped: {}, errors: {}, \
             subfolders created: {}, subfolders deleted: {}",
            self.copied,
            self.updated,
            self.deleted,
            self.skipped,
            self.errored,
            self.dirs_created,
            self.dirs_deleted,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
