use std::path::PathBuf;

use thiserror::Error;

/// Error surface for logging setup and the scheduler runtime.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },

    #[error("a synchronization interval is required for periodic runs")]
    MissingInterval,

    #[error("sync pass join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
