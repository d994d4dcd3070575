use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{APP_NAME, DATA_DIR_ENV, LOG_DIR_ENV};

/// Log directory for the current platform, honouring `POSX_LOG_DIR`.
pub fn default_log_dir() -> Option<PathBuf> {
    if let Some(path) = env_path(LOG_DIR_ENV) {
        return Some(path);
    }
    dirs::home_dir().map(|home| platform_log_dir(env::consts::OS, &home))
}

/// Directory holding persisted desktop state, honouring `POSX_DATA_DIR`.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(path) = env_path(DATA_DIR_ENV) {
        return Some(path);
    }
    dirs::config_dir().map(|config| config.join(APP_NAME))
}

/// Where the desktop shell writes its logs on `os` (an `std::env::consts::OS` value).
pub fn platform_log_dir(os: &str, home: &Path) -> PathBuf {
    match os {
        "windows" => home
            .join("AppData")
            .join("Roaming")
            .join(APP_NAME)
            .join("logs"),
        "macos" => home.join("Library").join("Logs").join(APP_NAME),
        _ => home.join(".config").join(APP_NAME).join("logs"),
    }
}

pub(crate) fn env_path(key: &str) -> Option<PathBuf> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(trimmed))
}
