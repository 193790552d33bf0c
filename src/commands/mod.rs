/// Commands module
/// Every user action (menu entry, toolbar button, shortcut) is a function
/// over the workbench. This is the boundary where failures turn into log
/// lines; nothing below it is allowed to reach the user as a crash.

pub mod debug;
pub mod explorer;
pub mod file;
pub mod plugin;
pub mod run;

pub use debug::{debug_current, debug_input, stop_debugger};
pub use explorer::{open_explorer_entry, open_folder, refresh_explorer};
pub use file::{close_current_tab, complete_at, new_file, open_file, redo, save_as, save_file, undo};
pub use plugin::{invoke_menu, load_plugins};
pub use run::run_current;
