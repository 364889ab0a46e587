use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::broadcast;

use dirmirror_core::{SyncResult, ValidatedConfig};
use dirmirror_sync::SyncEngine;

use crate::error::{io_err, DaemonError};
use crate::logging;

/// Repeats synchronization passes on a fixed interval until shut down.
///
/// The interval is measured from the end of one pass to the start of the
/// next. Shutdown is only observed between passes, so a pass in progress
/// always runs to completion.
#[derive(Debug, Clone)]
pub struct Scheduler {
    engine: SyncEngine,
    source: PathBuf,
    replica: PathBuf,
    interval: Duration,
    max_passes: Option<u64>,
}

/// What a scheduler run did before it stopped.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub passes: u64,
    /// Failures summed over all passes.
    pub errored: usize,
    pub last: Option<SyncResult>,
}

impl Scheduler {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        interval: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            engine: SyncEngine::new(dry_run),
            source: source.into(),
            replica: replica.into(),
            interval,
            max_passes: None,
        }
    }

    pub fn from_config(config: &ValidatedConfig) -> Result<Self, DaemonError> {
        let interval = config.interval.ok_or(DaemonError::MissingInterval)?;
        Ok(Self::new(
            config.source.clone(),
            config.replica.clone(),
            interval,
            config.dry_run,
        ))
    }

    /// Stop on its own after `passes` passes.
    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until ctrl-c (or `max_passes`).
    pub async fn run(&self) -> Result<RunReport, DaemonError> {
        let (shutdown_tx, _) = broadcast::channel::<()>(4);

        let signal_handle = {
            let shutdown = shutdown_tx.clone();
            tokio::spawn(async move {
                let mut shutdown_rx = shutdown.subscribe();
                tokio::select! {
                    _ = shutdown_rx.recv() => Ok(()),
                    signal = tokio::signal::ctrl_c() => match signal {
                        Ok(()) => {
                            tracing::info!("Shutdown requested, finishing current cycle");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    },
                }
            })
        };

        let report = self.run_with_shutdown(shutdown_tx.subscribe()).await;
        let _ = shutdown_tx.send(());
        handle_join(signal_handle.await)?;
        report
    }

    /// Run until `shutdown` fires (or `max_passes`).
    pub async fn run_with_shutdown(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RunReport, DaemonError> {
        let mut report = RunReport::default();
        loop {
            tracing::info!("Synchronization is starting...");
            let result = self.pass().await?;
            tracing::info!(
                copied = result.copied,
                updated = result.updated,
                deleted = result.deleted,
                skipped = result.skipped,
                errored = result.errored,
                dirs_created = result.dirs_created,
                dirs_deleted = result.dirs_deleted,
                duration_ms = result.duration_ms,
                "Synchronization completed",
            );

            report.passes += 1;
            report.errored += result.errored;
            report.last = Some(result);

            if self.max_passes.is_some_and(|max| report.passes >= max) {
                break;
            }

            tracing::debug!("Next synchronization in {}s", self.interval.as_secs());
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        tracing::info!("Application shutdown complete");
        Ok(report)
    }

    async fn pass(&self) -> Result<SyncResult, DaemonError> {
        let engine = self.engine;
        let source = self.source.clone();
        let replica = self.replica.clone();
        let result =
            tokio::task::spawn_blocking(move || engine.synchronize(&source, &replica)).await?;
        Ok(result)
    }
}

fn handle_join(
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Join(err)),
    }
}

/// Set up logging, then run the scheduler on a fresh runtime and block the
/// current thread until it stops.
pub fn start_blocking(config: &ValidatedConfig) -> Result<RunReport, DaemonError> {
    logging::init(config.log_level, config.log_file.as_deref())?;
    for line in config.to_string().lines() {
        tracing::info!("{line}");
    }

    let scheduler = Scheduler::from_config(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(scheduler.run())
}
