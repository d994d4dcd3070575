use std::{
    path::Path,
    process::{Command, Stdio},
};

/// Opens a directory in the platform file browser without waiting for it.
pub fn open_in_file_browser(path: &Path) -> Result<(), String> {
    let (program, args) = opener_command(path);
    Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run '{program}': {error}"))
}

#[cfg(target_os = "macos")]
fn opener_command(path: &Path) -> (&'static str, Vec<String>) {
    ("open", vec![path.display().to_string()])
}

#[cfg(target_os = "windows")]
fn opener_command(path: &Path) -> (&'static str, Vec<String>) {
    ("explorer", vec![path.display().to_string()])
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(path: &Path) -> (&'static str, Vec<String>) {
    ("xdg-open", vec![path.display().to_string()])
}
