/// Run command
/// Saves the active file and runs it off the UI thread; the result comes
/// back through the workbench queue.

use std::path::PathBuf;

use crate::commands::file::save_file;
use crate::workbench::{UiEvent, Workbench};

/// Returns true when a run was dispatched
pub fn run_current(wb: &mut Workbench) -> bool {
    let Some(path) = saved_active_path(wb, "running") else {
        return false;
    };

    if wb.run_in_progress {
        wb.log_output("[INFO] A run is already in progress.");
        return false;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    wb.log_output(&format!("\n>>> Running {}...", name));

    wb.run_in_progress = true;
    let tx = wb.event_sender();
    let script = path.clone();
    wb.launcher.spawn_run(path, move |result| {
        let _ = tx.send(UiEvent::RunFinished { script, result });
    });
    true
}

/// Path of the active buffer after making sure disk matches the editor
pub(crate) fn saved_active_path(wb: &mut Workbench, action: &str) -> Option<PathBuf> {
    let Some(buffer) = wb.tabs.active() else {
        wb.log_output(&format!("[ERROR] No file is open for {}.", action));
        return None;
    };

    let Some(path) = buffer.path().map(|p| p.to_path_buf()) else {
        wb.log_output(&format!("[ERROR] Save the file before {}.", action));
        return None;
    };

    if buffer.is_dirty() && !save_file(wb) {
        return None;
    }
    Some(path)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::commands::file::{new_file, open_file};
    use crate::config::Config;
    use std::time::{Duration, Instant};

    fn sh_workbench() -> Workbench {
        Workbench::new(Config {
            interpreter: "sh".to_string(),
            run_timeout_secs: 5,
            ..Config::default()
        })
    }

    fn pump_until(wb: &mut Workbench, needle: &str) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();
        while Instant::now() < deadline {
            wb.pump_timeout(Duration::from_millis(50));
            seen.extend(wb.take_log_updates());
            if seen.iter().any(|l| l.contains(needle)) {
                break;
            }
        }
        seen
    }

    #[test]
    fn untitled_buffer_is_not_run() {
        let mut wb = sh_workbench();
        new_file(&mut wb);
        assert!(!run_current(&mut wb));
    }

    #[test]
    fn run_saves_first_and_logs_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.sh");
        std::fs::write(&path, "echo stale\n").unwrap();

        let mut wb = sh_workbench();
        open_file(&mut wb, &path).unwrap();
        wb.tabs.active_mut().unwrap().on_user_edit("echo fresh\necho oops >&2\n");

        assert!(run_current(&mut wb));
        let log = pump_until(&mut wb, "finished with exit code");

        assert!(log.iter().any(|l| l == "fresh"));
        assert!(log.iter().any(|l| l == "ERROR:\noops"));
        assert!(!wb.tabs().active().unwrap().is_dirty());
        assert!(!wb.run_in_progress);
    }
}
