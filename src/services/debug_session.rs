/// Debug Session Bridge
/// Runs a script under a line-oriented interactive debugger and bridges it to
/// the UI through queues. One relay thread per output stream, one dispatch
/// thread that owns the child and feeds it queued commands.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{LaunchError, SubmitError};
use crate::models::{OutputStream, SessionEvent, SessionState};
use crate::services::{env, process};

/// How long teardown waits for the output relays to reach EOF
const RELAY_JOIN_GRACE: Duration = Duration::from_secs(2);
const RELAY_JOIN_POLL: Duration = Duration::from_millis(10);

/// Receives every session event, called from background threads
pub type SessionObserver = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Messages on the input queue
enum Dispatch {
    Command(String),
    Shutdown,
}

/// State shared between the bridge and the worker threads
struct SessionShared {
    state: Mutex<SessionState>,
    relay_failed: AtomicBool,
    observer: SessionObserver,
}

impl SessionShared {
    fn emit(&self, event: SessionEvent) {
        (self.observer)(event);
    }

    fn set_state(&self, state: SessionState) {
        *self.state.lock() = state;
        log::debug!("debug session -> {}", state.label());
        self.emit(SessionEvent::StateChanged { state });
    }

    fn state(&self) -> SessionState {
        *self.state.lock()
    }
}

/// One debugger run. Never reused: every start builds a new one.
struct DebugSession {
    shared: Arc<SessionShared>,
    commands: Sender<Dispatch>,
    dispatch_thread: Option<thread::JoinHandle<()>>,
    pid: u32,
    script: PathBuf,
}

impl DebugSession {
    fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Ask the dispatch thread to tear down. Hands out its handle once;
    /// later calls get `None`.
    fn request_stop(&mut self) -> Option<thread::JoinHandle<()>> {
        let handle = self.dispatch_thread.take()?;
        // The receiver is gone once the thread has finished on its own
        let _ = self.commands.send(Dispatch::Shutdown);
        Some(handle)
    }
}

fn join_dispatch(handle: thread::JoinHandle<()>) {
    if handle.join().is_err() {
        log::error!("debug dispatch thread panicked");
    }
}

/// Splits a byte stream into lines. A trailing fragment without newline is
/// released after each read so prompts like `(Pdb) ` show up immediately.
#[derive(Default)]
struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(Self::decode(&raw[..raw.len() - 1]));
        }

        // Hold back a fragment that ends inside a multi-byte character
        if !self.pending.is_empty() && std::str::from_utf8(&self.pending).is_ok() {
            lines.push(Self::decode(&self.pending));
            self.pending.clear();
        }

        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            let line = Self::decode(&self.pending);
            self.pending.clear();
            Some(line)
        }
    }

    fn decode(raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        String::from_utf8_lossy(raw).into_owned()
    }
}

/// Relay one child stream to the observer until EOF or error
fn spawn_relay(
    stream: OutputStream,
    mut reader: impl Read + Send + 'static,
    shared: Arc<SessionShared>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        let mut splitter = LineSplitter::default();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break, // EOF
                Ok(n) => {
                    for line in splitter.push(&buf[..n]) {
                        shared.emit(SessionEvent::Output { stream, line });
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("debugger {:?} relay failed: {}", stream, e);
                    shared.relay_failed.store(true, Ordering::SeqCst);
                    shared.emit(SessionEvent::Error {
                        message: format!("lost debugger {:?}: {}", stream, e),
                    });
                    break;
                }
            }
        }
        if let Some(line) = splitter.finish() {
            shared.emit(SessionEvent::Output { stream, line });
        }
    })
}

/// One command per line, flushed right away like a typist pressing Enter
fn write_command(stdin: &mut ChildStdin, text: &str) -> std::io::Result<()> {
    stdin.write_all(text.as_bytes())?;
    stdin.write_all(b"\n")?;
    stdin.flush()
}

/// Feed queued commands to the child and watch for its exit.
/// Owns the child; every way out of the loop ends in `teardown`.
fn dispatch_loop(
    mut child: Child,
    mut stdin: ChildStdin,
    commands: Receiver<Dispatch>,
    relays: Vec<thread::JoinHandle<()>>,
    shared: Arc<SessionShared>,
    poll: Duration,
) {
    let mut exit_status = None;

    loop {
        match process::try_finish(&mut child) {
            Ok(Some(status)) => {
                log::info!("debugger exited on its own ({})", status);
                exit_status = Some(status);
                break;
            }
            Ok(None) => {}
            Err(e) => {
                shared.emit(SessionEvent::Error {
                    message: format!("failed to poll debugger: {}", e),
                });
                break;
            }
        }

        if shared.relay_failed.load(Ordering::SeqCst) {
            break;
        }

        match commands.recv_timeout(poll) {
            Ok(Dispatch::Command(text)) => {
                if let Err(e) = write_command(&mut stdin, &text) {
                    log::warn!("write to debugger failed: {}", e);
                    shared.emit(SessionEvent::Error {
                        message: format!("failed to send command to debugger: {}", e),
                    });
                    break;
                }
            }
            Ok(Dispatch::Shutdown) => break,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    teardown(child, stdin, relays, &shared, exit_status);
}

/// Release everything the session holds: stdin, the process, the relays
fn teardown(
    mut child: Child,
    stdin: ChildStdin,
    relays: Vec<thread::JoinHandle<()>>,
    shared: &SessionShared,
    exit_status: Option<ExitStatus>,
) {
    shared.set_state(SessionState::Stopping);
    drop(stdin);

    // An exit seen by try_finish already took the group down and reaped
    let status = match exit_status {
        Some(status) => Ok(status),
        None => process::kill_and_reap(&mut child),
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            shared.emit(SessionEvent::Error {
                message: format!("failed to reap debugger: {}", e),
            });
            None
        }
    };

    join_relays(relays, RELAY_JOIN_GRACE);

    *shared.state.lock() = SessionState::Terminated;
    shared.emit(SessionEvent::Exited { code });
    shared.emit(SessionEvent::StateChanged {
        state: SessionState::Terminated,
    });
}

/// Wait for the relays to hit EOF, but not forever: a process that left the
/// group (setsid) can keep a pipe open after the kill. Relays still blocked
/// when the grace runs out are detached.
fn join_relays(relays: Vec<thread::JoinHandle<()>>, grace: Duration) {
    let deadline = Instant::now() + grace;
    while relays.iter().any(|r| !r.is_finished()) && Instant::now() < deadline {
        thread::sleep(RELAY_JOIN_POLL);
    }

    for relay in relays {
        if !relay.is_finished() {
            log::warn!("debugger output still open after {:?}, detaching relay", grace);
        } else if relay.join().is_err() {
            log::error!("debugger relay thread panicked");
        }
    }
}

/// Check the target before anything is spawned
fn validate_target(script: &Path) -> Result<(), LaunchError> {
    let invalid = |reason: String| LaunchError::InvalidTarget {
        path: script.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(script).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_file() {
        return Err(invalid("not a regular file".to_string()));
    }
    File::open(script).map_err(|e| invalid(e.to_string()))?;
    Ok(())
}

/// Debug bridge - owns at most one debug session at a time
pub struct DebugBridge {
    interpreter: String,
    debugger_args: Vec<String>,
    poll_interval: Duration,
    session: Mutex<Option<DebugSession>>,
}

impl DebugBridge {
    pub fn new(interpreter: impl Into<String>, debugger_args: Vec<String>, poll_interval: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            debugger_args,
            poll_interval,
            session: Mutex::new(None),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.interpreter.clone(),
            config.debugger_args(),
            config.poll_interval(),
        )
    }

    /// Start `<interpreter> <debugger args> <script>` with all three streams piped
    pub fn start(
        &self,
        script: &Path,
        observer: impl Fn(SessionEvent) + Send + Sync + 'static,
    ) -> Result<(), LaunchError> {
        let mut session = self.session.lock();

        if session.as_ref().map_or(false, |s| s.state().is_active()) {
            return Err(LaunchError::SessionAlreadyActive);
        }
        validate_target(script)?;

        // Previous session is terminated; make sure its thread is gone
        if let Some(handle) = session.take().and_then(|mut old| old.request_stop()) {
            join_dispatch(handle);
        }

        let shared = Arc::new(SessionShared {
            state: Mutex::new(SessionState::Idle),
            relay_failed: AtomicBool::new(false),
            observer: Arc::new(observer),
        });
        shared.set_state(SessionState::Starting);

        let mut command = Command::new(&self.interpreter);
        command
            .args(&self.debugger_args)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        env::apply_child_env(&mut command);
        process::isolate_group(&mut command);

        let spawn_failed = |source: std::io::Error| LaunchError::ProcessSpawnFailed {
            path: script.to_path_buf(),
            source,
        };

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                shared.set_state(SessionState::Terminated);
                return Err(spawn_failed(e));
            }
        };

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (stdin, stdout, stderr) = match pipes {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => {
                let _ = process::kill_and_reap(&mut child);
                shared.set_state(SessionState::Terminated);
                return Err(spawn_failed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "child stdio was not captured",
                )));
            }
        };

        let pid = child.id();
        log::info!(
            "debugging {} with {} {:?} (pid {})",
            script.display(),
            self.interpreter,
            self.debugger_args,
            pid
        );

        // Running before any worker can observe an exit and move on to Stopping
        shared.set_state(SessionState::Running);

        let relays = vec![
            spawn_relay(OutputStream::Stdout, stdout, shared.clone()),
            spawn_relay(OutputStream::Stderr, stderr, shared.clone()),
        ];

        let (tx, rx) = unbounded();
        let poll = self.poll_interval;
        let worker_shared = shared.clone();
        let dispatch_thread = thread::spawn(move || {
            dispatch_loop(child, stdin, rx, relays, worker_shared, poll);
        });

        *session = Some(DebugSession {
            shared,
            commands: tx,
            dispatch_thread: Some(dispatch_thread),
            pid,
            script: script.to_path_buf(),
        });

        Ok(())
    }

    /// Queue a command for the debugger
    pub fn submit_command(&self, text: &str) -> Result<(), SubmitError> {
        let session = self.session.lock();
        match session.as_ref() {
            Some(s) if s.state() == SessionState::Running => s
                .commands
                .send(Dispatch::Command(text.to_string()))
                .map_err(|_| SubmitError::NotRunning),
            _ => Err(SubmitError::NotRunning),
        }
    }

    /// Kill the debugger and wait for cleanup. No-op without a live session.
    pub fn stop(&self) {
        let handle = self
            .session
            .lock()
            .as_mut()
            .and_then(DebugSession::request_stop);

        // Joined without the lock so state() and pid() answer meanwhile.
        // A start() in between sees Running or Stopping and is refused.
        if let Some(handle) = handle {
            join_dispatch(handle);
        }
    }

    pub fn state(&self) -> SessionState {
        self.session
            .lock()
            .as_ref()
            .map_or(SessionState::Idle, |s| s.state())
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// Process id of the current or last debugger child
    pub fn pid(&self) -> Option<u32> {
        self.session.lock().as_ref().map(|s| s.pid)
    }

    pub fn script(&self) -> Option<PathBuf> {
        self.session.lock().as_ref().map(|s| s.script.clone())
    }
}

impl Drop for DebugBridge {
    fn drop(&mut self) {
        // Never leave a debugger behind
        self.stop();
    }
}
