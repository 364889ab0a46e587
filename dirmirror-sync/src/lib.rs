//! # dirmirror-sync
//!
//! One-way mirroring engine: size-then-SHA-256 change detection, per
//! directory diffing, action execution with dry-run support, and depth-first
//! recursion driven by the source tree.
//!
//! Call [`synchronize`] (or [`SyncEngine::synchronize`]) to run one pass.
//! Logging goes through the `log` facade; without an installed logger every
//! call is a no-op.

pub mod comparator;
pub mod differ;
pub mod engine;
pub mod executor;
pub mod listing;

pub use dirmirror_core::{SyncError, SyncResult};
pub use differ::{diff, DirectoryDiff, TypeConflict};
pub use engine::{synchronize, SyncEngine};
pub use executor::{ActionOutcome, DirOutcome};
