/// Error types
/// One enum per failure domain. Command handlers turn all of these into
/// terminal log lines; nothing here is meant to reach the process level.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures starting a debug session
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn debugger for {path}: {source}")]
    ProcessSpawnFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid debug target {path}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    #[error("a debug session is already active")]
    SessionAlreadyActive,
}

/// Failures feeding a command to the debugger
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("no debug session is running")]
    NotRunning,
}

/// Failures running a script to completion
#[derive(Debug, Error)]
pub enum RunError {
    #[error("process timed out after {}s and was killed", .after.as_secs())]
    TimedOut { after: Duration },

    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while waiting for process: {0}")]
    Io(#[from] std::io::Error),
}

/// Buffer persistence failures
#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to save {path}: {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("buffer has no file path yet")]
    NoPath,
}

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to load plugin {name}: {reason}")]
    LoadFailed { name: String, reason: String },
}

impl PluginError {
    pub fn load_failed(name: impl Into<String>, reason: impl ToString) -> Self {
        PluginError::LoadFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
