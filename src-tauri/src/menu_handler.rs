use posx_shell_core::{system_open, AppShell, UpdateTrigger};
use tauri::{AppHandle, Manager};

use crate::{append_desktop_log, append_shutdown_log, append_update_log, menu_actions, MenuState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ManualCheckDecision {
    IgnoreBecauseQuitting,
    IgnoreBecauseUpdaterUnavailable,
    Proceed,
}

pub(crate) fn decide_manual_check(quitting: bool, updater_available: bool) -> ManualCheckDecision {
    if quitting {
        ManualCheckDecision::IgnoreBecauseQuitting
    } else if !updater_available {
        ManualCheckDecision::IgnoreBecauseUpdaterUnavailable
    } else {
        ManualCheckDecision::Proceed
    }
}

/// Requests a manual update check. Returns whether the request was queued.
pub(crate) fn request_manual_check(shell: &AppShell) -> bool {
    match decide_manual_check(shell.is_quitting(), shell.updates().is_some()) {
        ManualCheckDecision::IgnoreBecauseQuitting => {
            append_update_log("manual update check ignored: application is quitting");
            false
        }
        ManualCheckDecision::IgnoreBecauseUpdaterUnavailable => {
            append_update_log("manual update check ignored: updater is not available");
            false
        }
        ManualCheckDecision::Proceed => {
            append_update_log("manual update check requested");
            shell
                .updates()
                .is_some_and(|updates| updates.request_check(UpdateTrigger::Manual))
        }
    }
}

pub fn handle_menu_event(app_handle: &AppHandle, menu_id: &str) {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        append_desktop_log(&format!("menu event {menu_id} ignored: shell not ready"));
        return;
    };

    match menu_actions::action_from_menu_id(menu_id) {
        Some(menu_actions::MenuAction::CheckForUpdates) => {
            request_manual_check(&shell);
        }
        Some(menu_actions::MenuAction::ToggleAutoUpdateCheck) => {
            let enabled = !shell.state().auto_update_check_enabled();
            let persisted = match shell.state().set_auto_update_check_enabled(enabled) {
                Ok(()) => {
                    append_desktop_log(&format!(
                        "menu toggled auto update check: {}",
                        if enabled { "enabled" } else { "disabled" }
                    ));
                    enabled
                }
                Err(error) => {
                    append_desktop_log(&format!(
                        "failed to persist auto update check setting: {error}"
                    ));
                    !enabled
                }
            };
            if let Some(menu_state) = app_handle.try_state::<MenuState>() {
                if let Err(error) = menu_state.auto_update_check_item.set_checked(persisted) {
                    append_desktop_log(&format!(
                        "failed to refresh auto update menu item: {error}"
                    ));
                }
            }
        }
        Some(menu_actions::MenuAction::ViewLogs) => match shell.config().log_dir.as_deref() {
            Some(log_dir) => {
                if let Err(error) = system_open::open_in_file_browser(log_dir) {
                    append_desktop_log(&format!("failed to open logs directory: {error}"));
                }
            }
            None => append_desktop_log("view logs skipped: no log directory configured"),
        },
        Some(menu_actions::MenuAction::Quit) => {
            shell.mark_quitting();
            append_shutdown_log("menu quit requested, exiting desktop process");
            app_handle.exit(0);
        }
        None => {}
    }
}
