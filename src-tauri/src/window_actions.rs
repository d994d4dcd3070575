use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindowBuilder};

use crate::{
    MAIN_WINDOW_HEIGHT, MAIN_WINDOW_LABEL, MAIN_WINDOW_PAGE, MAIN_WINDOW_TITLE, MAIN_WINDOW_WIDTH,
    PROGRESS_WINDOW_HEIGHT, PROGRESS_WINDOW_LABEL, PROGRESS_WINDOW_PAGE, PROGRESS_WINDOW_WIDTH,
};

pub fn create_main_window<F>(app_handle: &AppHandle, log: F) -> Result<(), String>
where
    F: Fn(&str),
{
    if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_some() {
        log("main window already exists, showing it");
        show_main_window(app_handle, log);
        return Ok(());
    }

    WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::App(MAIN_WINDOW_PAGE.into()),
    )
    .title(MAIN_WINDOW_TITLE)
    .inner_size(MAIN_WINDOW_WIDTH, MAIN_WINDOW_HEIGHT)
    .build()
    .map(|_| ())
    .map_err(|error| format!("Failed to build main window: {error}"))
}

pub fn show_main_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("show_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressWindowOpen {
    /// A new window was built; it reports readiness once its page loads.
    Created,
    /// A window from an earlier download was still open and is ready now.
    Reused,
}

/// Opens the frameless progress window. It stays hidden until its page loads.
pub fn open_progress_window<F>(app_handle: &AppHandle, log: F) -> Result<ProgressWindowOpen, String>
where
    F: Fn(&str),
{
    if app_handle.get_webview_window(PROGRESS_WINDOW_LABEL).is_some() {
        log("progress window already open, reusing it");
        reveal_progress_window(app_handle, log);
        return Ok(ProgressWindowOpen::Reused);
    }

    let mut builder = WebviewWindowBuilder::new(
        app_handle,
        PROGRESS_WINDOW_LABEL,
        WebviewUrl::App(PROGRESS_WINDOW_PAGE.into()),
    )
    .title("Downloading update")
    .inner_size(PROGRESS_WINDOW_WIDTH, PROGRESS_WINDOW_HEIGHT)
    .resizable(false)
    .decorations(false)
    .always_on_top(true)
    .center()
    .visible(false);

    if let Some(main_window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        builder = builder
            .parent(&main_window)
            .map_err(|error| format!("Failed to attach progress window to main window: {error}"))?;
    }

    let window = builder
        .build()
        .map_err(|error| format!("Failed to build progress window: {error}"))?;
    if let Err(error) = window.remove_menu() {
        log(&format!("failed to remove progress window menu: {error}"));
    }
    Ok(ProgressWindowOpen::Created)
}

pub fn reveal_progress_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    if let Some(window) = app_handle.get_webview_window(PROGRESS_WINDOW_LABEL) {
        if let Err(error) = window.show() {
            log(&format!("failed to show progress window: {error}"));
        }
    }
}

pub fn close_progress_window<F>(app_handle: &AppHandle, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(PROGRESS_WINDOW_LABEL) else {
        return;
    };
    if let Err(error) = window.destroy() {
        log(&format!("failed to close progress window: {error}"));
    }
}
