pub mod config;
pub mod log;
pub mod process;
pub mod watch;

use std::path::PathBuf;

use dtewatch_core::AppConfig;

/// Path used when `--config` is not given.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dtewatch")
        .join("config.json")
}

/// Default location of the SQLite event database, next to the config file.
pub fn default_log_db_path() -> PathBuf {
    default_config_path().with_file_name("log.db")
}

/// Load the configuration from `--config` or the default location,
/// falling back to defaults when no file exists yet.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<AppConfig> {
    match config_path {
        Some(path) => Ok(AppConfig::from_file(std::path::Path::new(path))?),
        None => {
            let path = default_config_path();
            if path.exists() {
                Ok(AppConfig::from_file(&path)?)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}
