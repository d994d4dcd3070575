use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use thiserror::Error;
use tracing_subscriber::{
    filter::LevelFilter, fmt, fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{COMBINED_LOG_FILE, ERROR_LOG_FILE, LOG_BACKUP_COUNT, LOG_FILTER_ENV, LOG_MAX_BYTES};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install tracing subscriber")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopLogCategory {
    Startup,
    Runtime,
    Update,
    Shutdown,
}

impl DesktopLogCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Runtime => "runtime",
            Self::Update => "update",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Installs the global subscriber: console output plus, when `log_dir` is set,
/// a rotating `combined.log` and an error-only `error.log`.
pub fn init_logging(log_dir: Option<&Path>) -> Result<(), LoggingError> {
    let console = fmt::layer()
        .with_target(false)
        .with_filter(env_filter());

    let files = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
            let combined = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(RotatingLogFile::new(
                    dir.join(COMBINED_LOG_FILE),
                    LOG_MAX_BYTES,
                    LOG_BACKUP_COUNT,
                ))
                .with_filter(env_filter());
            let errors = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(RotatingLogFile::new(
                    dir.join(ERROR_LOG_FILE),
                    LOG_MAX_BYTES,
                    LOG_BACKUP_COUNT,
                ))
                .with_filter(LevelFilter::ERROR);
            Some(combined.and_then(errors))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(files)
        .try_init()?;

    tracing::info!(
        category = DesktopLogCategory::Startup.as_str(),
        log_dir = ?log_dir,
        platform = std::env::consts::OS,
        version = env!("CARGO_PKG_VERSION"),
        "logger initialized"
    );
    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn append_desktop_log(category: DesktopLogCategory, message: &str) {
    tracing::info!(category = category.as_str(), "{message}");
}

pub fn append_desktop_error(category: DesktopLogCategory, message: &str) {
    tracing::error!(category = category.as_str(), "{message}");
}

/// Size-rotated log file: `name.log` rolls to `name.1.log` … `name.<backups>.log`.
#[derive(Debug, Clone)]
pub struct RotatingLogFile {
    inner: Arc<Mutex<RotatingState>>,
}

#[derive(Debug)]
struct RotatingState {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: Option<File>,
    written: u64,
}

impl RotatingLogFile {
    pub fn new(path: PathBuf, max_bytes: u64, backups: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RotatingState {
                path,
                max_bytes,
                backups,
                file: None,
                written: 0,
            })),
        }
    }
}

pub struct RotatingLogWriter {
    inner: Arc<Mutex<RotatingState>>,
}

impl<'a> MakeWriter<'a> for RotatingLogFile {
    type Writer = RotatingLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RotatingLogWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for RotatingLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        state.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?;
        match state.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl RotatingState {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.file.is_none() {
            self.open()?;
        }
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
            self.written += buf.len() as u64;
        }
        Ok(())
    }

    fn open(&mut self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = file.metadata().map(|meta| meta.len()).unwrap_or(0);
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;
        if self.backups == 0 {
            fs::remove_file(&self.path)?;
            return self.open();
        }

        let oldest = backup_path(&self.path, self.backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.backups).rev() {
            let from = backup_path(&self.path, index);
            if from.exists() {
                fs::rename(&from, backup_path(&self.path, index + 1))?;
            }
        }
        fs::rename(&self.path, backup_path(&self.path, 1))?;
        self.open()
    }
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}.{index}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{index}"),
    };
    path.with_file_name(name)
}
