//! `dirmirror sync` — one pass, then a summary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use dirmirror_core::{SyncConfig, SyncResult};
use dirmirror_daemon::logging;
use dirmirror_sync::SyncEngine;

use crate::LogLevelArg;

/// Arguments for `dirmirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Folder to mirror from.
    pub source: PathBuf,

    /// Folder kept identical to the source.
    pub replica: PathBuf,

    /// Report what would change without touching the replica.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the pass summary as JSON.
    #[arg(long)]
    pub json: bool,

    /// dbg, inf, wrn or err. Anything else means inf.
    #[arg(long)]
    pub log_level: Option<LogLevelArg>,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let config = SyncConfig {
            source: Some(self.source),
            replica: Some(self.replica),
            log_level: self.log_level.map(Into::into),
            dry_run: Some(self.dry_run),
            ..SyncConfig::default()
        }
        .validate()
        .context("invalid arguments")?;

        logging::init_stderr(config.log_level);

        let result = SyncEngine::new(config.dry_run).synchronize(&config.source, &config.replica);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).context("failed to serialize summary JSON")?
            );
            return Ok(());
        }

        print_summary(&config.source, &config.replica, &result);
        Ok(())
    }
}

fn print_summary(source: &Path, replica: &Path, result: &SyncResult) {
    let prefix = if result.dry_run { "[dry-run] " } else { "" };
    let mark = if result.errored == 0 {
        "✓".green().bold()
    } else {
        "!".yellow().bold()
    };
    let state = if result.is_clean() {
        "already in sync"
    } else {
        "synchronized"
    };

    println!(
        "{prefix}{mark} '{}' → '{}' {state}",
        source.display(),
        replica.display()
    );
    println!(
        "  files:   {} copied, {} updated, {} deleted, {} unchanged",
        result.copied, result.updated, result.deleted, result.skipped
    );
    println!(
        "  folders: {} created, {} deleted, {} visited",
        result.dirs_created,
        result.dirs_deleted,
        result.visited.len()
    );
    if result.errored > 0 {
        println!(
            "  {}",
            format!("{} items failed; rerun with --log-level dbg for details", result.errored)
                .red()
        );
    }
    println!("  took {} ms", result.duration_ms);
}
