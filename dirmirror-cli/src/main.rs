//! dirmirror — one-way directory mirroring.
//!
//! # Usage
//!
//! ```text
//! dirmirror run <source> <replica> --log-file <path> --interval <secs> [--log-level dbg|inf|wrn|err] [--dry-run] [--config <yaml>]
//! dirmirror sync <source> <replica> [--dry-run] [--json] [--log-level dbg|inf|wrn|err]
//! ```

mod commands;

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{run::RunArgs, sync::SyncArgs};
use dirmirror_core::LogLevel;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "dirmirror",
    version,
    about = "Keep a replica folder identical to a source folder",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Synchronize periodically until ctrl-c, logging to console and file.
    Run(RunArgs),

    /// Run a single synchronization pass and print a summary.
    Sync(SyncArgs),
}

// ---------------------------------------------------------------------------
// Shared log level argument
// ---------------------------------------------------------------------------

/// Lenient wrapper so clap accepts any level string; unknown values fall
/// back to `inf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogLevelArg(pub LogLevel);

impl FromStr for LogLevelArg {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(LogLevel::parse_lenient(s)))
    }
}

impl fmt::Display for LogLevelArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<LogLevelArg> for LogLevel {
    fn from(l: LogLevelArg) -> Self {
        l.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => args.run(),
        Commands::Sync(args) => args.run(),
    }
}
