use posx_shell_core::AppShell;
use tauri::{
    menu::{CheckMenuItem, Menu, MenuItem, PredefinedMenuItem, Submenu},
    AppHandle, Manager,
};

use crate::{append_desktop_log, menu_actions, MenuState};

pub fn setup_menu(app_handle: &AppHandle) -> Result<(), String> {
    let auto_update_check_enabled = app_handle
        .try_state::<AppShell>()
        .map(|shell| shell.state().auto_update_check_enabled())
        .unwrap_or(true);

    let check_item = MenuItem::with_id(
        app_handle,
        menu_actions::MENU_CHECK_FOR_UPDATES,
        "Check for Updates…",
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create check-for-updates menu item: {error}"))?;
    let auto_update_check_item = CheckMenuItem::with_id(
        app_handle,
        menu_actions::MENU_TOGGLE_AUTO_UPDATE_CHECK,
        "Automatic Update Checks",
        true,
        auto_update_check_enabled,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create auto update menu item: {error}"))?;
    let view_logs_item = MenuItem::with_id(
        app_handle,
        menu_actions::MENU_VIEW_LOGS,
        "View Logs",
        true,
        None::<&str>,
    )
    .map_err(|error| format!("Failed to create view-logs menu item: {error}"))?;
    let quit_item = MenuItem::with_id(
        app_handle,
        menu_actions::MENU_QUIT,
        "Quit",
        true,
        Some("CmdOrCtrl+Q"),
    )
    .map_err(|error| format!("Failed to create quit menu item: {error}"))?;
    let update_separator = PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create menu separator: {error}"))?;
    let quit_separator = PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create menu separator: {error}"))?;

    let app_submenu = Submenu::with_items(
        app_handle,
        "POSX",
        true,
        &[
            &check_item,
            &auto_update_check_item,
            &update_separator,
            &view_logs_item,
            &quit_separator,
            &quit_item,
        ],
    )
    .map_err(|error| format!("Failed to build application submenu: {error}"))?;
    let edit_submenu = build_edit_submenu(app_handle)?;

    let menu = Menu::with_items(app_handle, &[&app_submenu, &edit_submenu])
        .map_err(|error| format!("Failed to build application menu: {error}"))?;

    if !app_handle.manage(MenuState {
        auto_update_check_item: auto_update_check_item.clone(),
    }) {
        append_desktop_log("menu state already exists, skipping manage");
    }

    app_handle
        .set_menu(menu)
        .map_err(|error| format!("Failed to attach application menu: {error}"))?;
    Ok(())
}

// Clipboard shortcuts in the webview need these entries on macOS.
fn build_edit_submenu(app_handle: &AppHandle) -> Result<Submenu<tauri::Wry>, String> {
    let edit_error = |error: tauri::Error| format!("Failed to build edit submenu: {error}");
    Submenu::with_items(
        app_handle,
        "Edit",
        true,
        &[
            &PredefinedMenuItem::undo(app_handle, None).map_err(edit_error)?,
            &PredefinedMenuItem::redo(app_handle, None).map_err(edit_error)?,
            &PredefinedMenuItem::separator(app_handle).map_err(edit_error)?,
            &PredefinedMenuItem::cut(app_handle, None).map_err(edit_error)?,
            &PredefinedMenuItem::copy(app_handle, None).map_err(edit_error)?,
            &PredefinedMenuItem::paste(app_handle, None).map_err(edit_error)?,
            &PredefinedMenuItem::select_all(app_handle, None).map_err(edit_error)?,
        ],
    )
    .map_err(edit_error)
}
