//! Log output: `YYYY-MM-DD HH:MM:SS LVL - message` lines to the console and,
//! for periodic runs, to a daily-rolling log file.
//!
//! The sync crate logs through the `log` facade; `try_init` installs the
//! `log` → `tracing` bridge so those records land in the same sinks.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use dirmirror_core::LogLevel;
use tracing::{Event, Level, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::error::{io_err, DaemonError};

/// Event format shared by the console and the log file.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now();
        write!(
            writer,
            "{} {} - ",
            now.format("%Y-%m-%d %H:%M:%S"),
            level_tag(event.metadata().level())
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Three-letter level tag. `TRACE` folds into `DBG`.
pub fn level_tag(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERR",
        Level::WARN => "WRN",
        Level::INFO => "INF",
        Level::DEBUG | Level::TRACE => "DBG",
    }
}

/// Install the global subscriber writing to stdout and, when given, to a
/// daily-rolling file next to `log_file`.
///
/// `RUST_LOG` overrides `level`. A subscriber that is already installed is
/// left in place.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> Result<(), DaemonError> {
    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(std::io::stdout.and(open_appender(path)?)),
        None => BoxMakeWriter::new(std::io::stdout),
    };
    install(level, writer);
    Ok(())
}

/// Console-only logging on stderr, leaving stdout for command output.
pub fn init_stderr(level: LogLevel) {
    install(level, BoxMakeWriter::new(std::io::stderr));
}

fn install(level: LogLevel, writer: BoxMakeWriter) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .event_format(LineFormat)
        .with_writer(writer)
        .try_init();
}

/// Open the daily-rolling appender for `path`.
///
/// `logs/sync.log` rolls as `logs/sync.<date>.log`. The parent directory is
/// created when missing.
pub fn open_appender(path: &Path) -> Result<RollingFileAppender, DaemonError> {
    let (dir, prefix, suffix) = log_file_parts(path);
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix);
    if let Some(suffix) = suffix {
        builder = builder.filename_suffix(suffix);
    }
    builder.build(&dir).map_err(|source| DaemonError::LogFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Split a log file path into (directory, file stem, extension).
pub fn log_file_parts(path: &Path) -> (PathBuf, String, Option<String>) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dirmirror".to_string());
    let suffix = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned());
    (dir, prefix, suffix)
}
