/// Configuration
/// Optional `ball-ide.json` in the working directory, environment overrides
/// on top. Every field has a default so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "ball-ide.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter used for both run and debug
    pub interpreter: String,
    /// Module passed as `-m <module>` when debugging
    pub debugger_module: String,
    pub run_timeout_secs: u64,
    /// Dispatch loop queue wait, which is also the child liveness poll
    pub poll_interval_ms: u64,
    pub plugins_dir: PathBuf,
    /// Terminal log cap; oldest lines are dropped first
    pub max_log_lines: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter().to_string(),
            debugger_module: "pdb".to_string(),
            run_timeout_secs: 10,
            poll_interval_ms: 50,
            plugins_dir: PathBuf::from("plugins"),
            max_log_lines: 2000,
        }
    }
}

fn default_interpreter() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// `BALL_IDE_PYTHON` and `BALL_IDE_PLUGINS` win over the file
    pub fn apply_env(&mut self) {
        if let Ok(interpreter) = std::env::var("BALL_IDE_PYTHON") {
            if !interpreter.trim().is_empty() {
                self.interpreter = interpreter;
            }
        }
        if let Ok(dir) = std::env::var("BALL_IDE_PLUGINS") {
            if !dir.trim().is_empty() {
                self.plugins_dir = PathBuf::from(dir);
            }
        }
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Arguments placed between the interpreter and the script when debugging
    pub fn debugger_args(&self) -> Vec<String> {
        if self.debugger_module.is_empty() {
            Vec::new()
        } else {
            vec!["-m".to_string(), self.debugger_module.clone()]
        }
    }
}
