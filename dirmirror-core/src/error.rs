//! Error types for dirmirror-core.

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::EntryKind;

/// Failures the engine can hit while synchronizing one item.
///
/// None of these abort a pass: item-level errors are logged and the item is
/// skipped until the next pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The path vanished or never existed.
    #[error("path not found: {path}")]
    PathNotFound { path: PathBuf },

    /// The OS refused access to the path.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Any other read/write/copy/delete failure, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The same name is a file on one side and a directory on the other.
    #[error("type conflict for '{name}': {source_kind} in source, {replica_kind} in replica")]
    TypeConflict {
        name: String,
        source_kind: EntryKind,
        replica_kind: EntryKind,
    },
}

/// Classify an [`std::io::Error`] against the path it happened on.
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    let path = path.into();
    match source.kind() {
        ErrorKind::NotFound => SyncError::PathNotFound { path },
        ErrorKind::PermissionDenied => SyncError::PermissionDenied { path },
        _ => SyncError::Io { path, source },
    }
}

/// Invalid run configuration. Raised before any pass starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source folder '{path}' does not exist")]
    SourceNotFound { path: PathBuf },

    #[error("source path '{path}' is not a directory")]
    SourceNotDirectory { path: PathBuf },

    #[error("source and replica folders must be different")]
    SameFolders,

    #[error("replica folder must not be a subfolder of the source folder")]
    ReplicaInsideSource,

    #[error("source folder must not be a subfolder of the replica folder")]
    SourceInsideReplica,

    #[error("log file '{path}' must not be located inside the source or the replica folder")]
    LogFileInsideTree { path: PathBuf },

    #[error("synchronization interval must be a positive number of seconds, got {0}")]
    InvalidInterval(u64),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("cannot resolve path {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load, with file path.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
