use std::time::Duration;

pub const APP_NAME: &str = "posx-pk";

pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: u16 = 3000;
pub const BACKEND_PORT_ENV: &str = "PORT";

pub const PRIMARY_HEALTH_PATH: &str = "/";
pub const FALLBACK_HEALTH_PATH: &str = "/api/hello";

pub const RUN_MODE_ENV: &str = "POSX_ENV";
pub const BACKEND_PORT_OVERRIDE_ENV: &str = "POSX_BACKEND_PORT";
pub const BACKEND_CMD_ENV: &str = "POSX_BACKEND_CMD";
pub const BACKEND_DIR_ENV: &str = "POSX_BACKEND_DIR";
pub const BACKEND_STRATEGY_ENV: &str = "POSX_BACKEND_STRATEGY";
pub const BACKEND_SETTLE_ENV: &str = "POSX_BACKEND_SETTLE_MS";
pub const BACKEND_RETRY_ENV: &str = "POSX_BACKEND_RETRY_MS";
pub const BACKEND_PROBE_TIMEOUT_ENV: &str = "POSX_BACKEND_PROBE_TIMEOUT_MS";
pub const DATA_DIR_ENV: &str = "POSX_DATA_DIR";
pub const LOG_DIR_ENV: &str = "POSX_LOG_DIR";
pub const LOG_FILTER_ENV: &str = "POSX_LOG";

pub const DEFAULT_BACKEND_SETTLE_MS: u64 = 1_500;
pub const DEFAULT_BACKEND_RETRY_MS: u64 = 3_000;
pub const BACKEND_DELAY_MAX_MS: u64 = 60_000;
pub const DEFAULT_BACKEND_PROBE_TIMEOUT_MS: u64 = 5_000;
pub const BACKEND_PROBE_TIMEOUT_MIN_MS: u64 = 100;
pub const BACKEND_PROBE_TIMEOUT_MAX_MS: u64 = 30_000;

pub const DOWNLOAD_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub const DESKTOP_STATE_FILE: &str = "desktop_state.json";
pub const BACKEND_LOG_FILE: &str = "backend.log";
pub const COMBINED_LOG_FILE: &str = "combined.log";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const LOG_MAX_BYTES: u64 = 5 * 1024 * 1024;
pub const LOG_BACKUP_COUNT: usize = 5;
