//! Log directory inspection for `posx-logs`.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use posx_shell_core::ERROR_LOG_FILE;

pub const DEFAULT_TAIL_LINES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileEntry {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDirectory {
    Missing,
    Empty,
    Files(Vec<LogFileEntry>),
}

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub dir: PathBuf,
    pub lines: usize,
    pub open: bool,
}

/// `*.log` files in `dir`, sorted by name.
pub fn scan_log_dir(dir: &Path) -> io::Result<LogDirectory> {
    if !dir.is_dir() {
        return Ok(LogDirectory::Missing);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(".log") {
            continue;
        }
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            files.push(LogFileEntry {
                name,
                size_bytes: metadata.len(),
            });
        }
    }
    files.sort_by(|left, right| left.name.cmp(&right.name));

    Ok(if files.is_empty() {
        LogDirectory::Empty
    } else {
        LogDirectory::Files(files)
    })
}

/// The last `count` non-blank lines of the file, or `None` if it does not exist.
pub fn tail_lines(path: &Path, count: usize) -> io::Result<Option<Vec<String>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };
    let lines: Vec<&str> = content.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(count);
    Ok(Some(lines[start..].iter().map(|line| line.to_string()).collect()))
}

pub fn format_size_kb(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

/// Writes the report. Missing or unreadable logs are reported, never failed on;
/// only a broken output stream is an error.
pub fn write_report<W, F>(out: &mut W, options: &ViewOptions, open_dir: F) -> io::Result<()>
where
    W: Write,
    F: FnOnce(&Path) -> Result<(), String>,
{
    writeln!(out, "====================================")?;
    writeln!(out, "POSX Application Logs")?;
    writeln!(out, "====================================")?;
    writeln!(out, "Logs directory: {}", options.dir.display())?;
    writeln!(out)?;

    let files = match scan_log_dir(&options.dir) {
        Ok(LogDirectory::Missing) => {
            writeln!(out, "Logs directory does not exist yet.")?;
            writeln!(
                out,
                "It will be created the first time the application runs."
            )?;
            return Ok(());
        }
        Ok(LogDirectory::Empty) => {
            writeln!(out, "No log files found.")?;
            writeln!(out, "Log files are created when the application runs.")?;
            return Ok(());
        }
        Ok(LogDirectory::Files(files)) => files,
        Err(error) => {
            writeln!(out, "Failed to read logs directory: {error}")?;
            return Ok(());
        }
    };

    writeln!(out, "Available log files:")?;
    for (index, file) in files.iter().enumerate() {
        writeln!(
            out,
            "  {}. {} ({})",
            index + 1,
            file.name,
            format_size_kb(file.size_bytes)
        )?;
    }
    writeln!(out)?;

    if options.open {
        writeln!(out, "Opening logs directory...")?;
        if let Err(error) = open_dir(&options.dir) {
            writeln!(out, "Could not open logs directory: {error}")?;
        }
        writeln!(out)?;
    }

    let error_log = options.dir.join(ERROR_LOG_FILE);
    match tail_lines(&error_log, options.lines) {
        Ok(None) => {}
        Ok(Some(lines)) => {
            writeln!(out, "Recent errors from {ERROR_LOG_FILE}:")?;
            writeln!(out, "-----------------------------------")?;
            if lines.is_empty() {
                writeln!(out, "No errors logged")?;
            }
            for line in lines {
                writeln!(out, "{line}")?;
            }
            writeln!(out)?;
        }
        Err(error) => {
            writeln!(out, "Error reading {ERROR_LOG_FILE}: {error}")?;
            writeln!(out)?;
        }
    }
    Ok(())
}
