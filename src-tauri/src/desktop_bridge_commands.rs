use posx_shell_core::AppShell;
use serde_json::Value;
use tauri::{AppHandle, Manager};

use crate::{append_desktop_log, append_update_log, menu_handler, AppInfo, BridgeResult};

const SHELL_NOT_READY: &str = "Desktop shell is not ready.";

#[tauri::command]
pub(crate) fn save_user_data(app_handle: AppHandle, data: Value) -> bool {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        append_desktop_log("save_user_data ignored: shell not ready");
        return false;
    };
    match shell.state().save_user_data(data) {
        Ok(()) => true,
        Err(error) => {
            append_desktop_log(&format!("failed to save user data: {error}"));
            false
        }
    }
}

#[tauri::command]
pub(crate) fn get_user_data(app_handle: AppHandle) -> Option<Value> {
    let shell = app_handle.try_state::<AppShell>()?;
    match shell.state().user_data() {
        Ok(data) => data,
        Err(error) => {
            append_desktop_log(&format!("failed to read user data: {error}"));
            None
        }
    }
}

#[tauri::command]
pub(crate) fn delete_user_data(app_handle: AppHandle) -> bool {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        append_desktop_log("delete_user_data ignored: shell not ready");
        return false;
    };
    match shell.state().delete_user_data() {
        Ok(()) => true,
        Err(error) => {
            append_desktop_log(&format!("failed to delete user data: {error}"));
            false
        }
    }
}

#[tauri::command]
pub(crate) fn manual_check_update(app_handle: AppHandle) -> BridgeResult {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        return BridgeResult::failed(SHELL_NOT_READY);
    };
    if menu_handler::request_manual_check(&shell) {
        BridgeResult::ok()
    } else {
        BridgeResult::failed("Update check could not be started.")
    }
}

#[tauri::command]
pub(crate) fn cancel_download(app_handle: AppHandle) -> BridgeResult {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        return BridgeResult::failed(SHELL_NOT_READY);
    };
    append_update_log("download cancel requested from progress window");
    match shell.updates() {
        Some(updates) if updates.cancel_download() => BridgeResult::ok(),
        Some(_) => BridgeResult::failed("Updater has stopped."),
        None => BridgeResult::failed("Updater is not available."),
    }
}

#[tauri::command]
pub(crate) fn get_app_info(app_handle: AppHandle) -> Result<AppInfo, String> {
    let shell = app_handle
        .try_state::<AppShell>()
        .ok_or_else(|| SHELL_NOT_READY.to_string())?;
    let config = shell.config();
    let backend_url = config
        .backend_base_url()
        .map_err(|error| error.to_string())?;

    Ok(AppInfo {
        version: app_handle.package_info().version.to_string(),
        run_mode: config.mode,
        backend_url: backend_url.to_string(),
        data_dir: config.data_dir.display().to_string(),
        log_dir: config
            .log_dir
            .as_ref()
            .map(|log_dir| log_dir.display().to_string()),
        auto_update_check: shell.state().auto_update_check_enabled(),
    })
}
