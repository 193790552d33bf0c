/// Plugins
/// Plugins are compiled in and listed in a registry, plus shell-command
/// plugins described by `*.json` manifests in the plugins folder. Each one
/// registers against a narrow host capability, once, at startup.

use serde::Deserialize;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use crate::error::PluginError;
use crate::services::env;

/// Menu callback; receives the host again when the entry is picked
pub type MenuAction = Arc<dyn Fn(&mut dyn PluginHost) + Send + Sync>;

/// What a plugin may touch
pub trait PluginHost {
    fn add_menu_command(&mut self, label: &str, action: MenuAction);
    fn log(&mut self, message: &str);
    fn current_buffer(&self) -> Option<String>;
    /// Run `sh -c command` off the UI thread with `stdin` piped in; output
    /// comes back as log lines
    fn spawn_shell(&mut self, label: &str, command: &str, stdin: String);
}

pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;
    fn register(&self, host: &mut dyn PluginHost) -> Result<(), PluginError>;
}

/// Counts whitespace-separated words in the current buffer
pub struct WordCountPlugin;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

impl Plugin for WordCountPlugin {
    fn name(&self) -> &str {
        "word_count"
    }

    fn register(&self, host: &mut dyn PluginHost) -> Result<(), PluginError> {
        host.add_menu_command(
            "Word Count",
            Arc::new(|host: &mut dyn PluginHost| match host.current_buffer() {
                Some(content) => host.log(&format!(
                    "[Word Count] The current file has {} words.",
                    word_count(&content)
                )),
                None => host.log("[Word Count] No file is open."),
            }),
        );
        Ok(())
    }
}

/// `plugins/<name>.json`
#[derive(Debug, Clone, Deserialize)]
pub struct ShellPluginManifest {
    pub name: String,
    pub label: String,
    pub command: String,
}

/// Menu entry that pipes the current buffer through a shell command
pub struct ShellCommandPlugin {
    manifest: ShellPluginManifest,
}

impl ShellCommandPlugin {
    pub fn from_manifest(path: &Path) -> Result<Self, PluginError> {
        let fallback_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let raw = std::fs::read_to_string(path)
            .map_err(|e| PluginError::load_failed(&fallback_name, e))?;
        let manifest: ShellPluginManifest = serde_json::from_str(&raw)
            .map_err(|e| PluginError::load_failed(&fallback_name, e))?;

        if manifest.label.trim().is_empty() || manifest.command.trim().is_empty() {
            return Err(PluginError::load_failed(
                manifest.name,
                "manifest needs a non-empty label and command",
            ));
        }
        Ok(Self { manifest })
    }
}

impl Plugin for ShellCommandPlugin {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn register(&self, host: &mut dyn PluginHost) -> Result<(), PluginError> {
        let label = self.manifest.label.clone();
        let command = self.manifest.command.clone();
        host.add_menu_command(
            &self.manifest.label,
            Arc::new(move |host: &mut dyn PluginHost| {
                let stdin = host.current_buffer().unwrap_or_default();
                host.spawn_shell(&label, &command, stdin);
            }),
        );
        Ok(())
    }
}

/// Execute a shell command with `stdin` piped in and return its output
pub fn execute_shell(command: &str, stdin: String) -> Result<String, String> {
    // Platform-specific command execution
    #[cfg(target_os = "windows")]
    let mut cmd = Command::new("cmd");
    #[cfg(target_os = "windows")]
    cmd.args(["/C", command]);

    #[cfg(not(target_os = "windows"))]
    let mut cmd = Command::new("sh");
    #[cfg(not(target_os = "windows"))]
    cmd.arg("-c").arg(command);

    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    env::apply_child_env(&mut cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| format!("Failed to execute command: {}", e))?;

    // Feed stdin from a thread so a large buffer can't deadlock against stdout
    let writer = child.stdin.take().map(|mut pipe| {
        thread::spawn(move || {
            let _ = pipe.write_all(stdin.as_bytes());
        })
    });

    let output = child
        .wait_with_output()
        .map_err(|e| format!("Failed to execute command: {}", e))?;
    if let Some(writer) = writer {
        let _ = writer.join();
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        Ok(stdout)
    } else {
        // Return stderr if command failed
        Err(if stderr.is_empty() {
            "Command execution failed".to_string()
        } else {
            stderr
        })
    }
}

/// Outcome of loading one plugin
#[derive(Debug)]
pub struct PluginReport {
    pub name: String,
    pub result: Result<(), PluginError>,
}

#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the plugins shipped with the editor
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.add(Box::new(WordCountPlugin));
        registry
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register compiled plugins, then every manifest in `dir`.
    /// Creates `dir` if needed. One failure never stops the rest.
    pub fn load_all(&self, dir: &Path, host: &mut dyn PluginHost) -> Vec<PluginReport> {
        let mut reports = Vec::new();

        for plugin in &self.plugins {
            let result = register_guarded(plugin.as_ref(), host);
            reports.push(report(host, plugin.name().to_string(), result));
        }

        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("cannot create plugins dir {}: {}", dir.display(), e);
            let result = Err(PluginError::load_failed(dir.display().to_string(), e));
            reports.push(report(host, dir.display().to_string(), result));
            return reports;
        }

        for path in manifest_paths(dir) {
            let (name, result) = match ShellCommandPlugin::from_manifest(&path) {
                Ok(plugin) => {
                    let name = plugin.name().to_string();
                    (name, register_guarded(&plugin, host))
                }
                Err(e) => (path.display().to_string(), Err(e)),
            };
            reports.push(report(host, name, result));
        }

        reports
    }
}

/// A panicking plugin is a failed plugin, not a dead editor
fn register_guarded(plugin: &dyn Plugin, host: &mut dyn PluginHost) -> Result<(), PluginError> {
    match panic::catch_unwind(AssertUnwindSafe(|| plugin.register(host))) {
        Ok(result) => result,
        Err(_) => Err(PluginError::load_failed(plugin.name(), "panicked during register")),
    }
}

/// Run a menu action; a panic inside it is reported as `false`
pub fn invoke_guarded(action: &MenuAction, host: &mut dyn PluginHost) -> bool {
    panic::catch_unwind(AssertUnwindSafe(|| action(host))).is_ok()
}

fn report(host: &mut dyn PluginHost, name: String, result: Result<(), PluginError>) -> PluginReport {
    match &result {
        Ok(()) => {
            log::info!("loaded plugin {}", name);
            host.log(&format!("[INFO] Loaded plugin: {}", name));
        }
        Err(e) => {
            log::warn!("{}", e);
            host.log(&format!("[ERROR] {}", e));
        }
    }
    PluginReport { name, result }
}

/// `*.json` files in `dir`, sorted so load order is stable
fn manifest_paths(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "json"))
            .collect(),
        Err(e) => {
            log::warn!("cannot scan plugins dir {}: {}", dir.display(), e);
            Vec::new()
        }
    };
    paths.sort();
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct FakeHost {
        menu: Vec<(String, MenuAction)>,
        log: Vec<String>,
        buffer: Option<String>,
        shells: Vec<(String, String, String)>,
    }

    impl PluginHost for FakeHost {
        fn add_menu_command(&mut self, label: &str, action: MenuAction) {
            self.menu.push((label.to_string(), action));
        }
        fn log(&mut self, message: &str) {
            self.log.push(message.to_string());
        }
        fn current_buffer(&self) -> Option<String> {
            self.buffer.clone()
        }
        fn spawn_shell(&mut self, label: &str, command: &str, stdin: String) {
            self.shells.push((label.to_string(), command.to_string(), stdin));
        }
    }

    struct Exploding;

    impl Plugin for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }
        fn register(&self, _host: &mut dyn PluginHost) -> Result<(), PluginError> {
            panic!("boom");
        }
    }

    struct Refusing;

    impl Plugin for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }
        fn register(&self, _host: &mut dyn PluginHost) -> Result<(), PluginError> {
            Err(PluginError::load_failed("refusing", "not today"))
        }
    }

    #[test]
    fn word_count_menu_entry_logs_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FakeHost {
            buffer: Some("one two\nthree".to_string()),
            ..Default::default()
        };

        let reports = PluginRegistry::with_builtins().load_all(dir.path(), &mut host);
        assert!(reports.iter().all(|r| r.result.is_ok()));
        assert_eq!(host.menu[0].0, "Word Count");

        let action = host.menu[0].1.clone();
        action(&mut host as &mut dyn PluginHost);
        assert_eq!(
            host.log.last().unwrap(),
            "[Word Count] The current file has 3 words."
        );
    }

    #[test]
    fn failures_do_not_stop_other_plugins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_broken.json"), "{ nope").unwrap();
        std::fs::write(
            dir.path().join("b_upper.json"),
            r#"{ "name": "upper", "label": "Uppercase", "command": "tr a-z A-Z" }"#,
        )
        .unwrap();

        let mut registry = PluginRegistry::new();
        registry.add(Box::new(Exploding));
        registry.add(Box::new(Refusing));
        registry.add(Box::new(WordCountPlugin));

        let mut host = FakeHost::default();
        let reports = registry.load_all(dir.path(), &mut host);

        let outcome: Vec<_> = reports.iter().map(|r| r.result.is_ok()).collect();
        assert_eq!(outcome, vec![false, false, true, false, true]);
        let labels: Vec<_> = host.menu.iter().map(|(l, _)| l.as_str()).collect();
        assert_eq!(labels, vec!["Word Count", "Uppercase"]);
        assert!(host.log.iter().any(|l| l == "[INFO] Loaded plugin: upper"));
    }

    #[test]
    fn shell_plugin_forwards_buffer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("wc.json"),
            r#"{ "name": "wc", "label": "Line Count", "command": "wc -l" }"#,
        )
        .unwrap();

        let mut host = FakeHost {
            buffer: Some("a\nb\n".to_string()),
            ..Default::default()
        };
        PluginRegistry::new().load_all(dir.path(), &mut host);

        let action = host.menu[0].1.clone();
        action(&mut host as &mut dyn PluginHost);
        assert_eq!(
            host.shells,
            vec![("Line Count".to_string(), "wc -l".to_string(), "a\nb\n".to_string())]
        );
    }

    #[test]
    fn creates_missing_plugins_dir() {
        let dir = tempfile::tempdir().unwrap();
        let plugins = dir.path().join("plugins");
        PluginRegistry::new().load_all(&plugins, &mut FakeHost::default());
        assert!(plugins.is_dir());
    }

    #[test]
    fn empty_command_manifest_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.json");
        std::fs::write(&path, r#"{ "name": "x", "label": "X", "command": " " }"#).unwrap();
        assert!(ShellCommandPlugin::from_manifest(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn execute_shell_pipes_stdin() {
        assert_eq!(execute_shell("tr a-z A-Z", "abc".to_string()).unwrap(), "ABC");
        assert!(execute_shell("exit 2", String::new()).is_err());
    }
}
