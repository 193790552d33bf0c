/// Debug commands
/// Start, feed and stop the debugger for the active file. Session events
/// are posted to the workbench queue, never applied from the worker threads.

use crate::commands::run::saved_active_path;
use crate::workbench::{UiEvent, Workbench};

/// Returns true when a session was started
pub fn debug_current(wb: &mut Workbench) -> bool {
    let Some(path) = saved_active_path(wb, "debugging") else {
        return false;
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    wb.log_output(&format!("\n>>> Starting debugger for {}...", name));

    let tx = wb.event_sender();
    let started = wb.debugger.start(&path, move |event| {
        let _ = tx.send(UiEvent::Debug(event));
    });

    match started {
        Ok(()) => true,
        Err(e) => {
            wb.log_output(&format!("[ERROR] {}", e));
            false
        }
    }
}

/// Forward a line typed in the terminal to the debugger
pub fn debug_input(wb: &mut Workbench, command: &str) -> bool {
    match wb.debugger.submit_command(command) {
        Ok(()) => true,
        Err(e) => {
            wb.log_output(&format!("[ERROR] {}", e));
            false
        }
    }
}

pub fn stop_debugger(wb: &mut Workbench) {
    // Cleanup is reported through the session events
    wb.debugger.stop();
}
