use std::{path::PathBuf, time::Duration};

use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::{
    runtime_paths, BACKEND_CMD_ENV, BACKEND_DELAY_MAX_MS, BACKEND_DIR_ENV,
    BACKEND_PORT_OVERRIDE_ENV, BACKEND_PROBE_TIMEOUT_ENV, BACKEND_PROBE_TIMEOUT_MAX_MS,
    BACKEND_PROBE_TIMEOUT_MIN_MS, BACKEND_RETRY_ENV, BACKEND_SETTLE_ENV, BACKEND_STRATEGY_ENV,
    DATA_DIR_ENV, DEFAULT_BACKEND_HOST, DEFAULT_BACKEND_PORT, DEFAULT_BACKEND_PROBE_TIMEOUT_MS,
    DEFAULT_BACKEND_RETRY_MS, DEFAULT_BACKEND_SETTLE_MS, FALLBACK_HEALTH_PATH, LOG_DIR_ENV,
    PRIMARY_HEALTH_PATH, RUN_MODE_ENV,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid {key} command '{value}'")]
    InvalidCommand { key: &'static str, value: String },
    #[error("invalid backend url")]
    InvalidUrl {
        #[source]
        source: url::ParseError,
    },
    #[error("no data directory available; set POSX_DATA_DIR")]
    MissingDataDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    Production,
}

impl RunMode {
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

/// How a production backend is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionStrategy {
    /// Spawn the packaged entry point as a child process.
    ChildProcess,
    /// The backend is hosted elsewhere; only probe it.
    Attach,
}

impl ProductionStrategy {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "child" | "child-process" => Some(Self::ChildProcess),
            "attach" | "in-process" => Some(Self::Attach),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub mode: RunMode,
    pub production_strategy: ProductionStrategy,
    pub backend_host: String,
    pub backend_port: u16,
    pub backend_command: Option<Vec<String>>,
    pub backend_dir: Option<PathBuf>,
    pub settle_delay: Duration,
    pub retry_delay: Duration,
    pub probe_timeout: Duration,
    pub data_dir: PathBuf,
    pub log_dir: Option<PathBuf>,
}

impl ShellConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::resolve_from(|key| std::env::var(key).ok())?;
        if config.log_dir.is_none() {
            config.log_dir = runtime_paths::default_log_dir();
        }
        Ok(config)
    }

    /// Resolves the configuration from an arbitrary variable lookup.
    pub fn resolve_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mode = match read(RUN_MODE_ENV) {
            Some(raw) => RunMode::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: RUN_MODE_ENV,
                value: raw,
                expected: "development or production",
            })?,
            None => RunMode::for_build(),
        };

        let production_strategy = match read(BACKEND_STRATEGY_ENV) {
            Some(raw) => ProductionStrategy::parse(&raw).ok_or(ConfigError::InvalidValue {
                key: BACKEND_STRATEGY_ENV,
                value: raw,
                expected: "child or attach",
            })?,
            None => ProductionStrategy::ChildProcess,
        };

        let backend_port = match read(BACKEND_PORT_OVERRIDE_ENV) {
            Some(raw) => raw.parse::<u16>().ok().filter(|port| *port > 0).ok_or(
                ConfigError::InvalidValue {
                    key: BACKEND_PORT_OVERRIDE_ENV,
                    value: raw,
                    expected: "a TCP port",
                },
            )?,
            None => DEFAULT_BACKEND_PORT,
        };

        let backend_command = match read(BACKEND_CMD_ENV) {
            Some(raw) => {
                let pieces = shlex::split(&raw).filter(|pieces| !pieces.is_empty());
                Some(pieces.ok_or(ConfigError::InvalidCommand {
                    key: BACKEND_CMD_ENV,
                    value: raw,
                })?)
            }
            None => None,
        };

        let data_dir = read(DATA_DIR_ENV)
            .map(PathBuf::from)
            .or_else(runtime_paths::default_data_dir)
            .ok_or(ConfigError::MissingDataDir)?;

        Ok(Self {
            mode,
            production_strategy,
            backend_host: DEFAULT_BACKEND_HOST.to_string(),
            backend_port,
            backend_command,
            backend_dir: read(BACKEND_DIR_ENV).map(PathBuf::from),
            settle_delay: clamped_millis(
                read(BACKEND_SETTLE_ENV).as_deref(),
                DEFAULT_BACKEND_SETTLE_MS,
                0,
                BACKEND_DELAY_MAX_MS,
            ),
            retry_delay: clamped_millis(
                read(BACKEND_RETRY_ENV).as_deref(),
                DEFAULT_BACKEND_RETRY_MS,
                0,
                BACKEND_DELAY_MAX_MS,
            ),
            probe_timeout: clamped_millis(
                read(BACKEND_PROBE_TIMEOUT_ENV).as_deref(),
                DEFAULT_BACKEND_PROBE_TIMEOUT_MS,
                BACKEND_PROBE_TIMEOUT_MIN_MS,
                BACKEND_PROBE_TIMEOUT_MAX_MS,
            ),
            data_dir,
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        })
    }

    pub fn backend_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!(
            "http://{}:{}/",
            self.backend_host, self.backend_port
        ))
        .map_err(|source| ConfigError::InvalidUrl { source })
    }

    /// The primary and the retry liveness endpoints, in probing order.
    pub fn health_endpoints(&self) -> Result<[Url; 2], ConfigError> {
        let base = self.backend_base_url()?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|source| ConfigError::InvalidUrl { source })
        };
        Ok([join(PRIMARY_HEALTH_PATH)?, join(FALLBACK_HEALTH_PATH)?])
    }
}

fn clamped_millis(raw: Option<&str>, default_ms: u64, min_ms: u64, max_ms: u64) -> Duration {
    let parsed = raw
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(parsed.clamp(min_ms, max_ms))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(vars: &[(&str, &str)]) -> Result<ShellConfig, ConfigError> {
        let mut map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        map.entry(DATA_DIR_ENV.to_string())
            .or_insert_with(|| "/tmp/posx-data".to_string());
        ShellConfig::resolve_from(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_point_at_local_backend_on_port_3000() {
        let config = resolve(&[]).expect("defaults should resolve");
        assert_eq!(config.backend_port, 3000);
        assert_eq!(config.production_strategy, ProductionStrategy::ChildProcess);
        assert_eq!(config.settle_delay, Duration::from_millis(1_500));
        assert_eq!(config.retry_delay, Duration::from_millis(3_000));

        let [primary, fallback] = config.health_endpoints().expect("endpoints");
        assert_eq!(primary.as_str(), "http://127.0.0.1:3000/");
        assert_eq!(fallback.as_str(), "http://127.0.0.1:3000/api/hello");
    }

    #[test]
    fn custom_backend_command_is_split_like_a_shell() {
        let config = resolve(&[(BACKEND_CMD_ENV, "node \"dist/main.js\" --inspect")])
            .expect("command should resolve");
        assert_eq!(
            config.backend_command,
            Some(vec![
                "node".to_string(),
                "dist/main.js".to_string(),
                "--inspect".to_string()
            ])
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            resolve(&[(RUN_MODE_ENV, "staging")]),
            Err(ConfigError::InvalidValue { key: RUN_MODE_ENV, .. })
        ));
        assert!(matches!(
            resolve(&[(BACKEND_PORT_OVERRIDE_ENV, "0")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            resolve(&[(BACKEND_CMD_ENV, "node \"unterminated")]),
            Err(ConfigError::InvalidCommand { .. })
        ));
    }

    #[test]
    fn delays_are_clamped_and_fall_back_on_garbage() {
        let config = resolve(&[
            (BACKEND_SETTLE_ENV, "999999"),
            (BACKEND_RETRY_ENV, "soon"),
            (BACKEND_PROBE_TIMEOUT_ENV, "1"),
            (RUN_MODE_ENV, "Production"),
            (BACKEND_STRATEGY_ENV, "attach"),
        ])
        .expect("config should resolve");
        assert_eq!(config.settle_delay, Duration::from_millis(60_000));
        assert_eq!(config.retry_delay, Duration::from_millis(3_000));
        assert_eq!(config.probe_timeout, Duration::from_millis(100));
        assert_eq!(config.mode, RunMode::Production);
        assert_eq!(config.production_strategy, ProductionStrategy::Attach);
    }
}
