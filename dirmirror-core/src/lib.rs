//! dirmirror core library — domain types, run configuration, errors.
//!
//! - [`types`] — directory entries, file actions, pass summary
//! - [`error`] — [`SyncError`] and [`ConfigError`]
//! - [`config`] — load / merge / validate

pub mod config;
pub mod error;
pub mod types;

pub use config::{LogLevel, SyncConfig, ValidatedConfig};
pub use error::{io_err, ConfigError, SyncError};
pub use types::{
    ActionKind, DirectoryEntry, EntryKind, FileAction, SyncResult, UpdateReason,
};
