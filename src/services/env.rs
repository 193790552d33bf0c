/// Child environment
/// Desktop launchers start with a stripped environment, so children get
/// an extended PATH and the usual user variables copied explicitly.

use std::path::Path;
use std::process::Command;

/// Get the pyenv shims directory if pyenv is installed
fn get_pyenv_shims(home: &str) -> Option<String> {
    let root = std::env::var("PYENV_ROOT").unwrap_or_else(|_| format!("{}/.pyenv", home));
    let shims = format!("{}/shims", root);
    if Path::new(&shims).exists() {
        Some(shims)
    } else {
        None
    }
}

/// Build extended PATH with pyenv, Homebrew, and common locations
pub fn build_extended_path() -> String {
    let home = std::env::var("HOME").unwrap_or_default();
    let current_path = std::env::var("PATH").unwrap_or_default();

    if cfg!(windows) {
        return current_path;
    }

    let mut paths = vec![
        format!("{}/.local/bin", home),       // pip --user, pipx
        "/opt/homebrew/bin".to_string(),      // Homebrew Apple Silicon
        "/usr/local/bin".to_string(),         // Homebrew Intel / system
        "/usr/bin".to_string(),
        "/bin".to_string(),
        "/usr/sbin".to_string(),
        "/sbin".to_string(),
    ];

    if let Some(shims) = get_pyenv_shims(&home) {
        paths.insert(0, shims);
    }

    // Inherited PATH goes first so an activated virtualenv still wins
    if !current_path.is_empty() {
        paths.insert(0, current_path);
    }

    paths.join(":")
}

/// Apply the child environment to a command
pub fn apply_child_env(command: &mut Command) {
    for var in &["HOME", "USER", "SHELL", "LANG", "LC_ALL", "VIRTUAL_ENV", "PYTHONPATH"] {
        if let Ok(value) = std::env::var(var) {
            command.env(var, &value);
        }
    }

    command.env("PATH", build_extended_path());

    // Output must reach the relay as it is produced, not at exit
    command.env("PYTHONUNBUFFERED", "1");
    command.env("PYTHONIOENCODING", "utf-8");
}
