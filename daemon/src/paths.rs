//! Canonical file locations.
//!
//!   - config.toml  `<config dir>/sound-alerts/config.toml`, read by the daemon.
//!   - sounds/      next to the daemon binary unless overridden.
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "sound-alerts";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const SOUNDS_DIR_NAME: &str = "sounds";

/// Returns the per-user config directory for the daemon, if the platform has one.
pub fn app_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME))
}

/// Returns the full path to the config file, falling back to the working directory.
pub fn config_file_path() -> PathBuf {
    app_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_FILE_NAME)
}

/// Returns `sounds/` inside the installation directory (the directory holding `exe`).
pub fn sounds_dir_for(exe: &Path) -> PathBuf {
    exe.parent()
        .unwrap_or_else(|| Path::new("."))
        .join(SOUNDS_DIR_NAME)
}

/// Resolves the sounds directory: CLI override, then config, then next to the binary.
pub fn resolve_sounds_dir(cli: Option<&Path>, configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = cli.or(configured) {
        return dir.to_path_buf();
    }
    match std::env::current_exe() {
        Ok(exe) => sounds_dir_for(&exe),
        Err(_) => PathBuf::from(SOUNDS_DIR_NAME),
    }
}
