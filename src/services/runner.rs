/// Run Launcher
/// Runs a script to completion with captured output and a wall-clock limit.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::RunError;
use crate::models::RunResult;
use crate::services::{env, process};

/// How often the launcher checks whether the child is done
const WAIT_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
pub struct RunLauncher {
    interpreter: String,
    timeout: Duration,
}

impl RunLauncher {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.interpreter.clone(), config.run_timeout())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `<interpreter> <script>` and block until it exits or times out.
    /// The caller must have saved the buffer first.
    pub fn run(&self, script: &Path) -> Result<RunResult, RunError> {
        run_script(&self.interpreter, script, self.timeout)
    }

    /// Run on a worker thread and hand the result to `on_done` from there.
    /// Keeps the UI loop free; `on_done` should only enqueue.
    pub fn spawn_run(
        &self,
        script: PathBuf,
        on_done: impl FnOnce(Result<RunResult, RunError>) + Send + 'static,
    ) -> thread::JoinHandle<()> {
        let launcher = self.clone();
        thread::spawn(move || {
            let result = launcher.run(&script);
            on_done(result);
        })
    }
}

/// Drain a pipe to a string on its own thread so a chatty child never
/// blocks on a full pipe while we wait for it
fn collect(mut reader: impl Read + Send + 'static) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Err(e) = reader.read_to_end(&mut bytes) {
            log::warn!("failed to read child output: {}", e);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn join_output(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

pub fn run_script(interpreter: &str, script: &Path, timeout: Duration) -> Result<RunResult, RunError> {
    let mut command = Command::new(interpreter);
    command
        .arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    env::apply_child_env(&mut command);
    process::isolate_group(&mut command);

    let mut child = command.spawn().map_err(|source| RunError::SpawnFailed {
        program: interpreter.to_string(),
        source,
    })?;
    log::info!("running {} (pid {})", script.display(), child.id());

    let stdout = child.stdout.take().map(collect);
    let stderr = child.stderr.take().map(collect);

    let deadline = Instant::now() + timeout;
    // try_finish kills anything the script left in its group before reaping,
    // so a background job cannot hold our pipes open
    let status = loop {
        match process::try_finish(&mut child) {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                log::warn!("{} timed out after {:?}", script.display(), timeout);
                if let Err(e) = process::kill_and_reap(&mut child) {
                    log::error!("failed to reap timed out child: {}", e);
                }
                // Group is dead so the pipes are closed; partial output is dropped
                let _ = join_output(stdout);
                let _ = join_output(stderr);
                return Err(RunError::TimedOut { after: timeout });
            }
            Ok(None) => thread::sleep(WAIT_POLL),
            Err(e) => {
                let _ = process::kill_and_reap(&mut child);
                return Err(RunError::Io(e));
            }
        }
    };

    Ok(RunResult {
        stdout: join_output(stdout),
        stderr: join_output(stderr),
        exit_code: status.code(),
    })
}
