use std::{
    error::Error as StdError,
    fmt, io,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

const NETWORK_ERROR_CODES: [&str; 5] = [
    "ENOTFOUND",
    "ECONNREFUSED",
    "ETIMEDOUT",
    "ENETUNREACH",
    "ECONNRESET",
];
const NETWORK_MESSAGE_HINTS: [&str; 6] = [
    "network",
    "connection",
    "internet",
    "dns",
    "timeout",
    "getaddrinfo",
];

/// The remote feed behind auto-updates: query, fetch and apply a new version.
#[async_trait]
pub trait UpdateChannel: Send + Sync {
    fn current_version(&self) -> String;

    /// `Ok(None)` when the running version is the latest.
    async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError>;

    /// Fetches the update found by the last `check`, keeping the artifact for
    /// `install_and_relaunch`.
    async fn download(&self, progress: ProgressSink) -> Result<(), UpdateError>;

    async fn install_and_relaunch(&self) -> Result<(), UpdateError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    pub version: String,
    pub notes: Option<String>,
    pub published_at: Option<String>,
}

impl UpdateInfo {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            notes: None,
            published_at: None,
        }
    }

    /// Semver comparison; versions that do not parse only count as newer when
    /// they differ from the current one.
    pub fn is_newer_than(&self, current: &str) -> bool {
        let parse = |raw: &str| semver::Version::parse(raw.trim().trim_start_matches('v'));
        match (parse(&self.version), parse(current)) {
            (Ok(candidate), Ok(current)) => candidate > current,
            _ => self.version.trim() != current.trim(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallChoice {
    RestartNow,
    Later,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    Network,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpdateError {
    pub code: Option<String>,
    pub message: String,
}

impl UpdateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    /// Flattens an error chain into a message and infers a socket-style code
    /// from the first recognizable I/O or HTTP cause.
    pub fn from_error(error: &(dyn StdError + 'static)) -> Self {
        let mut message = error.to_string();
        let mut code = error_code(error);
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            if code.is_none() {
                code = error_code(cause);
            }
            source = cause.source();
        }
        Self { code, message }
    }

    pub fn kind(&self) -> UpdateErrorKind {
        let code_matches = self
            .code
            .as_deref()
            .is_some_and(|code| NETWORK_ERROR_CODES.contains(&code));
        let lowered = self.message.to_lowercase();
        let message_matches = NETWORK_MESSAGE_HINTS
            .iter()
            .any(|hint| lowered.contains(hint));

        if code_matches || message_matches {
            UpdateErrorKind::Network
        } else {
            UpdateErrorKind::Other
        }
    }
}

fn error_code(error: &(dyn StdError + 'static)) -> Option<String> {
    if let Some(io_error) = error.downcast_ref::<io::Error>() {
        let code = match io_error.kind() {
            io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
            io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => "ECONNRESET",
            io::ErrorKind::TimedOut => "ETIMEDOUT",
            io::ErrorKind::NetworkUnreachable | io::ErrorKind::HostUnreachable => "ENETUNREACH",
            _ => return None,
        };
        return Some(code.to_string());
    }
    if let Some(http_error) = error.downcast_ref::<reqwest::Error>() {
        if http_error.is_timeout() {
            return Some("ETIMEDOUT".to_string());
        }
        if http_error.is_connect() {
            return Some("ECONNREFUSED".to_string());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgressSnapshot {
    pub percent: f64,
    pub transferred: u64,
    pub total: Option<u64>,
    pub bytes_per_second: f64,
}

/// Turns transfer chunk callbacks into progress snapshots.
pub struct ProgressSink {
    started: Instant,
    transferred: u64,
    total: Option<u64>,
    report: Box<dyn FnMut(DownloadProgressSnapshot) + Send>,
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("transferred", &self.transferred)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

impl ProgressSink {
    pub fn new<F>(report: F) -> Self
    where
        F: FnMut(DownloadProgressSnapshot) + Send + 'static,
    {
        Self {
            started: Instant::now(),
            transferred: 0,
            total: None,
            report: Box::new(report),
        }
    }

    pub fn record_chunk(&mut self, chunk_len: u64, content_length: Option<u64>) {
        self.transferred = self.transferred.saturating_add(chunk_len);
        if content_length.is_some() {
            self.total = content_length;
        }
        let snapshot = self.snapshot_after(self.started.elapsed());
        (self.report)(snapshot);
    }

    fn snapshot_after(&self, elapsed: Duration) -> DownloadProgressSnapshot {
        let percent = match self.total {
            Some(total) if total > 0 => {
                ((self.transferred as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        let seconds = elapsed.as_secs_f64();
        let bytes_per_second = if seconds > 0.0 {
            self.transferred as f64 / seconds
        } else {
            0.0
        };

        DownloadProgressSnapshot {
            percent,
            transferred: self.transferred,
            total: self.total,
            bytes_per_second,
        }
    }
}
