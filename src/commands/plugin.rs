/// Plugin commands

use crate::services::plugins::{self, PluginRegistry, PluginReport};
use crate::workbench::Workbench;

/// Load every plugin once; call at startup only
pub fn load_plugins(wb: &mut Workbench, registry: &PluginRegistry) -> Vec<PluginReport> {
    let dir = wb.config.plugins_dir.clone();
    let reports = registry.load_all(&dir, wb);
    if wb.menu.is_empty() {
        wb.log_output("[INFO] No plugins loaded");
    }
    reports
}

/// Run the plugin menu entry at `index`
pub fn invoke_menu(wb: &mut Workbench, index: usize) -> bool {
    let Some((label, action)) = wb
        .menu
        .get(index)
        .map(|entry| (entry.label.clone(), entry.action.clone()))
    else {
        wb.log_output(&format!("[ERROR] No plugin menu entry {}", index));
        return false;
    };

    if plugins::invoke_guarded(&action, &mut *wb) {
        true
    } else {
        log::error!("plugin menu entry {} panicked", label);
        wb.log_output(&format!("[ERROR] plugin menu entry {} failed", label));
        false
    }
}
