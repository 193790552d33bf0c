/// File commands
/// New, open, save, save-as and close for the active tab.

use std::path::Path;

use crate::error::IoError;
use crate::models::TabId;
use crate::services::complete;
use crate::services::tabs::{CloseDecision, CloseOutcome};
use crate::workbench::Workbench;

pub fn new_file(wb: &mut Workbench) -> TabId {
    wb.tabs.new_tab()
}

/// Open `path`, or switch to it if it is already open
pub fn open_file(wb: &mut Workbench, path: &Path) -> Option<TabId> {
    match wb.tabs.open(path) {
        Ok(id) => {
            wb.log_output(&format!("[INFO] Opened: {}", path.display()));
            Some(id)
        }
        Err(e) => {
            wb.log_output(&format!("[ERROR] Failed to open file: {}", e));
            None
        }
    }
}

/// Save the active buffer. Returns false when there is nothing saved,
/// including an untitled buffer that still needs `save_as`.
pub fn save_file(wb: &mut Workbench) -> bool {
    let Some(buffer) = wb.tabs.active_mut() else {
        return false;
    };

    match buffer.save() {
        Ok(()) => {
            let path = buffer.path().map(|p| p.display().to_string()).unwrap_or_default();
            wb.log_output(&format!("[INFO] Saved: {}", path));
            true
        }
        Err(IoError::NoPath) => {
            wb.log_output("[INFO] Choose a file name with Save As first.");
            false
        }
        Err(e) => {
            wb.log_output(&format!("[ERROR] Save failed: {}", e));
            false
        }
    }
}

pub fn save_as(wb: &mut Workbench, path: &Path) -> bool {
    let Some(buffer) = wb.tabs.active_mut() else {
        return false;
    };

    match buffer.save_as(path) {
        Ok(()) => {
            wb.log_output(&format!("[INFO] Saved: {}", path.display()));
            true
        }
        Err(e) => {
            wb.log_output(&format!("[ERROR] Save failed: {}", e));
            false
        }
    }
}

/// Close the active tab. With `CloseDecision::Ask` a dirty tab stays open
/// and the caller is told to ask the user.
pub fn close_current_tab(wb: &mut Workbench, decision: CloseDecision) -> CloseOutcome {
    let Some(id) = wb.tabs.active_id() else {
        return CloseOutcome::NotFound;
    };

    match wb.tabs.close(id, decision) {
        Ok(CloseOutcome::NeedsDecision) => {
            wb.log_output("[INFO] You have unsaved changes. Save before closing?");
            CloseOutcome::NeedsDecision
        }
        Ok(outcome) => outcome,
        Err(e) => {
            wb.log_output(&format!("[ERROR] Save failed: {}", e));
            CloseOutcome::Cancelled
        }
    }
}

/// Undo the last edit in the active tab
pub fn undo(wb: &mut Workbench) -> bool {
    let undone = wb.tabs.active_mut().map_or(false, |b| b.undo());
    if !undone {
        wb.log_output("[INFO] Nothing to undo.");
    }
    undone
}

pub fn redo(wb: &mut Workbench) -> bool {
    let redone = wb.tabs.active_mut().map_or(false, |b| b.redo());
    if !redone {
        wb.log_output("[INFO] Nothing to redo.");
    }
    redone
}

/// Completion candidates at `cursor` in the active buffer
pub fn complete_at(wb: &Workbench, cursor: usize) -> Vec<String> {
    wb.tabs
        .active()
        .map(|b| complete::suggest(b.content(), cursor))
        .unwrap_or_default()
}
