/// Workbench
/// Application state owned by the UI thread. Background workers never touch
/// it directly: they post `UiEvent`s to its queue and the UI loop applies them.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::RunError;
use crate::models::{ExplorerEntry, OutputStream, RunResult, SessionEvent, SessionState, TabId};
use crate::services::buffer::BufferEvent;
use crate::services::debug_session::DebugBridge;
use crate::services::highlight::{PythonTokenizer, Tokenizer};
use crate::services::plugins::{self, MenuAction, PluginHost};
use crate::services::runner::RunLauncher;
use crate::services::tabs::TabSet;

/// Everything that reaches the UI thread from elsewhere
#[derive(Debug)]
pub enum UiEvent {
    Log(String),
    Debug(SessionEvent),
    RunFinished {
        script: PathBuf,
        result: Result<RunResult, RunError>,
    },
    Buffer(BufferEvent),
    ShellFinished {
        label: String,
        result: Result<String, String>,
    },
}

pub struct MenuEntry {
    pub label: String,
    pub(crate) action: MenuAction,
}

pub struct Workbench {
    pub(crate) config: Config,
    pub(crate) tabs: TabSet,
    pub(crate) tokenizer: Box<dyn Tokenizer>,
    pub(crate) debugger: DebugBridge,
    pub(crate) launcher: RunLauncher,
    pub(crate) menu: Vec<MenuEntry>,
    pub(crate) folder: Option<PathBuf>,
    pub(crate) explorer: Vec<ExplorerEntry>,
    pub(crate) run_in_progress: bool,
    log_lines: VecDeque<String>,
    unread: usize,
    title_changes: Vec<(TabId, String)>,
    events_tx: Sender<UiEvent>,
    events_rx: Receiver<UiEvent>,
}

impl Workbench {
    pub fn new(config: Config) -> Self {
        let (events_tx, events_rx) = unbounded();

        let buffer_tx = events_tx.clone();
        let tabs = TabSet::new().with_observer(move || {
            let tx = buffer_tx.clone();
            move |event: &BufferEvent| {
                let _ = tx.send(UiEvent::Buffer(event.clone()));
            }
        });

        let mut workbench = Self {
            tabs,
            tokenizer: Box::new(PythonTokenizer),
            debugger: DebugBridge::from_config(&config),
            launcher: RunLauncher::from_config(&config),
            menu: Vec::new(),
            folder: None,
            explorer: Vec::new(),
            run_in_progress: false,
            log_lines: VecDeque::new(),
            unread: 0,
            title_changes: Vec::new(),
            events_tx,
            events_rx,
            config,
        };
        workbench.log_output(">>> Ball Python IDE Terminal - Ready");
        workbench
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tabs(&self) -> &TabSet {
        &self.tabs
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    pub fn debug_state(&self) -> SessionState {
        self.debugger.state()
    }

    pub fn menu(&self) -> &[MenuEntry] {
        &self.menu
    }

    pub fn explorer(&self) -> &[ExplorerEntry] {
        &self.explorer
    }

    /// Sender for code that needs to post back to the UI loop
    pub fn event_sender(&self) -> Sender<UiEvent> {
        self.events_tx.clone()
    }

    pub fn events(&self) -> &Receiver<UiEvent> {
        &self.events_rx
    }

    /// Append to the terminal log, trimmed like the original output pane
    pub fn log_output(&mut self, message: &str) {
        let message = message.trim();
        self.log_lines.push_back(message.to_string());
        self.unread += 1;

        while self.log_lines.len() > self.config.max_log_lines.max(1) {
            self.log_lines.pop_front();
        }
        self.unread = self.unread.min(self.log_lines.len());
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log_lines.iter().map(String::as_str)
    }

    /// Lines logged since the last call
    pub fn take_log_updates(&mut self) -> Vec<String> {
        let start = self.log_lines.len() - self.unread;
        self.unread = 0;
        self.log_lines.iter().skip(start).cloned().collect()
    }

    /// Tab titles that changed since the last call
    pub fn take_title_changes(&mut self) -> Vec<(TabId, String)> {
        std::mem::take(&mut self.title_changes)
    }

    /// Apply every queued event without blocking
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Block up to `timeout` for one event, then drain the rest
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.apply(event);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::Log(message) => self.log_output(&message),
            UiEvent::Debug(event) => self.apply_debug(event),
            UiEvent::RunFinished { script, result } => {
                self.run_in_progress = false;
                self.apply_run(script, result);
            }
            UiEvent::Buffer(event) => {
                let known = self
                    .title_changes
                    .iter()
                    .rev()
                    .find(|(id, _)| *id == event.id)
                    .map(|(_, title)| title.as_str());
                if known != Some(event.title.as_str()) {
                    self.title_changes.push((event.id, event.title));
                }
            }
            UiEvent::ShellFinished { label, result } => match result {
                Ok(output) => self.log_output(&format!("[{}]\n{}", label, output)),
                Err(e) => self.log_output(&format!("[ERROR] {}: {}", label, e)),
            },
        }
    }

    fn apply_debug(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Output { stream: OutputStream::Stdout, line } => self.log_output(&line),
            SessionEvent::Output { stream: OutputStream::Stderr, line } => {
                self.log_output(&format!("ERROR: {}", line))
            }
            SessionEvent::Error { message } => self.log_output(&format!("[ERROR] {}", message)),
            SessionEvent::Exited { code } => match code {
                Some(code) => self.log_output(&format!(">>> Debugger exited with code {}.", code)),
                None => self.log_output(">>> Debugger killed."),
            },
            SessionEvent::StateChanged { state } => {
                log::debug!("debugger state {}", state.label());
                if state == SessionState::Terminated {
                    self.log_output(">>> Debugger stopped.");
                }
            }
        }
    }

    fn apply_run(&mut self, script: PathBuf, result: Result<RunResult, RunError>) {
        match result {
            Ok(run) => {
                if !run.stdout.trim().is_empty() {
                    self.log_output(&run.stdout);
                }
                if !run.stderr.trim().is_empty() {
                    self.log_output(&format!("ERROR:\n{}", run.stderr));
                }
                match run.exit_code {
                    Some(code) => self.log_output(&format!(
                        ">>> {} finished with exit code {}.",
                        script.display(),
                        code
                    )),
                    None => self.log_output(&format!(">>> {} was killed.", script.display())),
                }
            }
            Err(e) => self.log_output(&format!("[EXCEPTION] {}", e)),
        }
    }

    /// Stop anything still running; called on exit
    pub fn shutdown(&mut self) {
        if self.debugger.is_active() {
            log::info!("shutting down - stopping debugger");
        }
        self.debugger.stop();
        self.pump();
    }
}

impl PluginHost for Workbench {
    fn add_menu_command(&mut self, label: &str, action: MenuAction) {
        self.menu.push(MenuEntry {
            label: label.to_string(),
            action,
        });
    }

    fn log(&mut self, message: &str) {
        self.log_output(message);
    }

    fn current_buffer(&self) -> Option<String> {
        self.tabs.active().map(|b| b.content().to_string())
    }

    fn spawn_shell(&mut self, label: &str, command: &str, stdin: String) {
        let tx = self.events_tx.clone();
        let label = label.to_string();
        let command = command.to_string();
        thread::spawn(move || {
            let result = plugins::execute_shell(&command, stdin);
            let _ = tx.send(UiEvent::ShellFinished { label, result });
        });
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        self.debugger.stop();
    }
}
