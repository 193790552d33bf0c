pub mod commands;
pub mod config;
pub mod error;
pub mod frontend;
pub mod models;
pub mod services;
pub mod workbench;

use std::io;
use std::path::Path;

use config::{Config, CONFIG_FILE};
use services::PluginRegistry;
use workbench::Workbench;

fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

pub fn run() {
    init_logging();

    let (config, config_error) = match Config::load(Path::new(CONFIG_FILE)) {
        Ok(config) => (config, None),
        Err(e) => {
            log::warn!("{} - using defaults", e);
            let mut config = Config::default();
            config.apply_env();
            (config, Some(e))
        }
    };
    log::info!("interpreter: {}", config.interpreter);

    let mut wb = Workbench::new(config);
    if let Some(e) = config_error {
        wb.log_output(&format!("[ERROR] {}", e));
    }
    commands::load_plugins(&mut wb, &PluginRegistry::with_builtins());
    commands::new_file(&mut wb);

    let input = frontend::spawn_stdin_reader();
    let mut stdout = io::stdout();
    if let Err(e) = frontend::run_console(&mut wb, input, &mut stdout) {
        log::error!("terminal output failed: {}", e);
        wb.shutdown();
    }
    log::info!("App shutting down");
}
