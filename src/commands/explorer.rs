/// Explorer commands

use std::path::Path;

use crate::commands::file::open_file;
use crate::models::{EntryKind, TabId};
use crate::services::explorer;
use crate::workbench::Workbench;

pub fn open_folder(wb: &mut Workbench, dir: &Path) -> bool {
    wb.folder = Some(dir.to_path_buf());
    refresh_explorer(wb)
}

/// Re-list the open folder
pub fn refresh_explorer(wb: &mut Workbench) -> bool {
    let Some(dir) = wb.folder.clone() else {
        wb.explorer.clear();
        return false;
    };

    match explorer::list_folder(&dir) {
        Ok(entries) => {
            wb.explorer = entries;
            true
        }
        Err(e) => {
            wb.explorer.clear();
            wb.log_output(&format!("[ERROR] {}", e));
            false
        }
    }
}

/// Explorer pane text for the open folder
pub fn explorer_text(wb: &Workbench) -> Option<String> {
    let dir = wb.folder.as_deref()?;
    Some(explorer::render_tree(dir, &wb.explorer))
}

/// Open the file at `index` in the listing; folders are ignored
pub fn open_explorer_entry(wb: &mut Workbench, index: usize) -> Option<TabId> {
    let entry = wb.explorer.get(index)?;
    if entry.kind == EntryKind::Folder {
        return None;
    }
    let path = entry.path.clone();
    open_file(wb, &path)
}
