//! Path constants for configuration, outputs and the history database.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lyriclip";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the generation history database file
pub const HISTORY_DB_FILE_NAME: &str = "generations.db";

/// The name of the directory holding generated artifacts
pub const OUTPUT_DIR_NAME: &str = "generated_files";

/// The name of the log file
pub const LOG_FILE_NAME: &str = "lyriclip.log";

/// Get the configuration directory path (~/.config/lyriclip/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lyriclip/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the history database path (`~/.config/lyriclip/generations.db`)
#[must_use]
pub fn history_db_path() -> PathBuf {
    config_dir().join(HISTORY_DB_FILE_NAME)
}

/// Get the default output directory (`~/.config/lyriclip/generated_files`)
#[must_use]
pub fn output_dir() -> PathBuf {
    config_dir().join(OUTPUT_DIR_NAME)
}

/// Get the default directory for transient downloads
#[must_use]
pub fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(CONFIG_DIR_NAME)
}

/// Get the log file path (`~/.config/lyriclip/lyriclip.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}
