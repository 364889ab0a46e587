//! `dirmirror run` — periodic synchronization until ctrl-c.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use dirmirror_core::{SyncConfig, ValidatedConfig};

use crate::LogLevelArg;

/// Arguments for `dirmirror run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Folder to mirror from.
    pub source: Option<PathBuf>,

    /// Folder kept identical to the source.
    pub replica: Option<PathBuf>,

    /// Log file; rolls daily as `<stem>.<date>.<ext>`.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Seconds between the end of one pass and the start of the next.
    #[arg(long)]
    pub interval: Option<u64>,

    /// dbg, inf, wrn or err. Anything else means inf.
    #[arg(long)]
    pub log_level: Option<LogLevelArg>,

    /// Log what would change without touching the replica.
    #[arg(long)]
    pub dry_run: bool,

    /// YAML file with defaults for any of the above.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let config = self.resolve()?;
        let report = dirmirror_daemon::start_blocking(&config).context("scheduler failed")?;
        if report.errored > 0 {
            eprintln!(
                "{} passes, {} item failures (see log)",
                report.passes, report.errored
            );
        }
        Ok(())
    }

    /// Layer flags over the config file and validate the result.
    fn resolve(&self) -> Result<ValidatedConfig> {
        let base = match &self.config {
            Some(path) => SyncConfig::load(path)
                .with_context(|| format!("failed to load config '{}'", path.display()))?,
            None => SyncConfig::default(),
        };
        let config = base.merge(self.overrides());
        let validated = config.validate().context("invalid configuration")?;

        if validated.log_file.is_none() {
            bail!("a log file is required: pass --log-file or set log_file in the config");
        }
        if validated.interval.is_none() {
            bail!("an interval is required: pass --interval or set interval_secs in the config");
        }
        Ok(validated)
    }

    fn overrides(&self) -> SyncConfig {
        SyncConfig {
            source: self.source.clone(),
            replica: self.replica.clone(),
            log_file: self.log_file.clone(),
            interval_secs: self.interval,
            log_level: self.log_level.map(Into::into),
            dry_run: self.dry_run.then_some(true),
        }
    }
}
