//! Run configuration: loading, layering and validation.
//!
//! A [`SyncConfig`] may come from a YAML file, from command-line flags, or
//! both; [`SyncConfig::merge`] layers the command line over the file. Nothing
//! reaches the engine before [`SyncConfig::validate`] has turned it into a
//! [`ValidatedConfig`] with absolute, normalised paths.
//!
//! # File format
//!
//! ```yaml
//! source: /data/source
//! replica: /backup/replica
//! log_file: /var/log/dirmirror/sync.log
//! interval_secs: 60
//! log_level: inf
//! dry_run: false
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Log level
// ---------------------------------------------------------------------------

/// Minimum level written to the log sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogLevel {
    #[serde(rename = "dbg", alias = "debug")]
    Debug,
    #[default]
    #[serde(rename = "inf", alias = "info")]
    Information,
    #[serde(rename = "wrn", alias = "warn")]
    Warning,
    #[serde(rename = "err", alias = "error")]
    Error,
}

impl LogLevel {
    /// Parse a user-supplied level, falling back to [`LogLevel::Information`]
    /// for anything unrecognised.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    /// Directive understood by `tracing_subscriber::EnvFilter` and `log`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Information => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dbg" | "debug" => Ok(Self::Debug),
            "inf" | "info" => Ok(Self::Information),
            "wrn" | "warn" => Ok(Self::Warning),
            "err" | "error" => Ok(Self::Error),
            other => Err(format!(
                "unknown log level '{other}'; expected: dbg, inf, wrn, err"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DBG"),
            LogLevel::Information => write!(f, "INF"),
            LogLevel::Warning => write!(f, "WRN"),
            LogLevel::Error => write!(f, "ERR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw configuration
// ---------------------------------------------------------------------------

/// Unvalidated settings. Every field is optional so that a config file and
/// the command line can each supply part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

impl SyncConfig {
    /// Load a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `overrides` on top of `self`; any value set in `overrides` wins.
    pub fn merge(self, overrides: SyncConfig) -> SyncConfig {
        SyncConfig {
            source: overrides.source.or(self.source),
            replica: overrides.replica.or(self.replica),
            log_file: overrides.log_file.or(self.log_file),
            interval_secs: overrides.interval_secs.or(self.interval_secs),
            log_level: overrides.log_level.or(self.log_level),
            dry_run: overrides.dry_run.or(self.dry_run),
        }
    }

    /// Check every rule a run depends on and resolve paths.
    ///
    /// Source and replica are required; the log file and the interval are
    /// optional here and enforced by the caller that needs them.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let source = absolute(self.source.as_deref().ok_or(ConfigError::Missing("source"))?)?;
        let replica =
            absolute(self.replica.as_deref().ok_or(ConfigError::Missing("replica"))?)?;
        let log_file = self.log_file.as_deref().map(absolute).transpose()?;

        if let Some(log) = &log_file {
            if is_same_or_inside(log, &source) || is_same_or_inside(log, &replica) {
                return Err(ConfigError::LogFileInsideTree { path: log.clone() });
            }
        }

        if !source.exists() {
            return Err(ConfigError::SourceNotFound { path: source });
        }
        if !source.is_dir() {
            return Err(ConfigError::SourceNotDirectory { path: source });
        }
        if same_path(&source, &replica) {
            return Err(ConfigError::SameFolders);
        }
        if is_same_or_inside(&replica, &source) {
            return Err(ConfigError::ReplicaInsideSource);
        }
        if is_same_or_inside(&source, &replica) {
            return Err(ConfigError::SourceInsideReplica);
        }

        let interval = match self.interval_secs {
            Some(0) => return Err(ConfigError::InvalidInterval(0)),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(ValidatedConfig {
            source,
            replica,
            log_file,
            interval,
            log_level: self.log_level.unwrap_or_default(),
            dry_run: self.dry_run.unwrap_or(false),
        })
    }
}

/// Settings that passed [`SyncConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    /// Absolute, existing source directory.
    pub source: PathBuf,
    /// Absolute replica directory; created by the first pass if missing.
    pub replica: PathBuf,
    pub log_file: Option<PathBuf>,
    pub interval: Option<Duration>,
    pub log_level: LogLevel,
    pub dry_run: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Loaded configuration:")?;
        writeln!(f, "  - Source folder  : {}", self.source.display())?;
        writeln!(f, "  - Replica folder : {}", self.replica.display())?;
        match self.interval {
            Some(interval) => writeln!(f, "  - Sync interval  : {}s", interval.as_secs())?,
            None => writeln!(f, "  - Sync interval  : single pass")?,
        }
        match &self.log_file {
            Some(path) => writeln!(f, "  - Log file path  : {}", path.display())?,
            None => writeln!(f, "  - Log file path  : console only")?,
        }
        writeln!(f, "  - Log level      : {}", self.log_level)?;
        write!(f, "  - Dry run mode   : {}", self.dry_run)
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Make `path` absolute against the current directory and drop `.`/`..`
/// components lexically. The path does not need to exist.
pub fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    let abs = std::path::absolute(path).map_err(|source| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(normalize(&abs))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(windows)]
fn fold_case(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

#[cfg(not(windows))]
fn fold_case(path: &Path) -> PathBuf {
    path.to_path_buf()
}

fn same_path(a: &Path, b: &Path) -> bool {
    fold_case(a) == fold_case(b)
}

/// `child` equals `parent` or lies somewhere below it. Component-wise, so
/// `/data/src2` is not inside `/data/src`.
pub fn is_same_or_inside(child: &Path, parent: &Path) -> bool {
    fold_case(child).starts_with(fold_case(parent))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config(source: &Path, replica: &Path) -> SyncConfig {
        SyncConfig {
            source: Some(source.to_path_buf()),
            replica: Some(replica.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_drops_dot_components() {
        assert_eq!(
            normalize(Path::new("/a/./b/../c")),
            PathBuf::from("/a/c")
        );
    }

    #[test]
    fn sibling_with_common_prefix_is_not_inside() {
        assert!(!is_same_or_inside(Path::new("/data/src2"), Path::new("/data/src")));
        assert!(is_same_or_inside(Path::new("/data/src/x"), Path::new("/data/src")));
        assert!(is_same_or_inside(Path::new("/data/src/"), Path::new("/data/src")));
    }

    #[test]
    fn valid_config_resolves_defaults() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir(&source).unwrap();
        let replica = tmp.path().join("replica");

        let validated = config(&source, &replica).validate().expect("valid");
        assert_eq!(validated.source, source);
        assert_eq!(validated.replica, replica);
        assert_eq!(validated.log_level, LogLevel::Information);
        assert!(!validated.dry_run);
        assert!(validated.interval.is_none());
    }

    #[test]
    fn missing_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = config(&tmp.path().join("absent"), &tmp.path().join("replica"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound { .. }), "got: {err}");
    }

    #[test]
    fn replica_inside_source_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let err = config(tmp.path(), &tmp.path().join("nested"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReplicaInsideSource), "got: {err}");
    }

    #[test]
    fn source_inside_replica_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("inner");
        fs::create_dir(&source).unwrap();
        let err = config(&source, tmp.path()).validate().unwrap_err();
        assert!(matches!(err, ConfigError::SourceInsideReplica), "got: {err}");
    }

    #[test]
    fn identical_folders_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let with_dot = tmp.path().join(".");
        let err = config(tmp.path(), &with_dot).validate().unwrap_err();
        assert!(matches!(err, ConfigError::SameFolders), "got: {err}");
    }

    #[test]
    fn log_file_inside_replica_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir(&source).unwrap();
        let replica = tmp.path().join("replica");
        let mut cfg = config(&source, &replica);
        cfg.log_file = Some(replica.join("logs").join("sync.log"));
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::LogFileInsideTree { .. }), "got: {err}");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir(&source).unwrap();
        let mut cfg = config(&source, &tmp.path().join("replica"));
        cfg.interval_secs = Some(0);
        assert!(matches!(
            cfg.validate().unwrap_err(),
            ConfigError::InvalidInterval(0)
        ));
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = SyncConfig {
            source: Some("/from/file".into()),
            interval_secs: Some(30),
            log_level: Some(LogLevel::Debug),
            ..Default::default()
        };
        let cli = SyncConfig {
            source: Some("/from/cli".into()),
            dry_run: Some(true),
            ..Default::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.source, Some(PathBuf::from("/from/cli")));
        assert_eq!(merged.interval_secs, Some(30));
        assert_eq!(merged.log_level, Some(LogLevel::Debug));
        assert_eq!(merged.dry_run, Some(true));
    }

    #[test]
    fn lenient_level_falls_back_to_information() {
        assert_eq!(LogLevel::parse_lenient("verbose"), LogLevel::Information);
        assert_eq!(LogLevel::parse_lenient("WRN"), LogLevel::Warning);
    }
}
