use posx_shell_core::AppShell;
use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::append_shutdown_log;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExitRequestDecision {
    /// Last window closed on macOS: the app and its backend stay up.
    KeepRunning,
    Teardown,
}

/// `exit_code` is `None` when the request comes from the last window closing.
pub(crate) fn decide_exit_request(
    os: &str,
    exit_code: Option<i32>,
    quitting: bool,
) -> ExitRequestDecision {
    if os == "macos" && exit_code.is_none() && !quitting {
        ExitRequestDecision::KeepRunning
    } else {
        ExitRequestDecision::Teardown
    }
}

pub(crate) fn handle_exit_requested(
    app_handle: &AppHandle,
    exit_code: Option<i32>,
    api: &ExitRequestApi,
) {
    let quitting = app_handle
        .try_state::<AppShell>()
        .is_some_and(|shell| shell.is_quitting());

    match decide_exit_request(std::env::consts::OS, exit_code, quitting) {
        ExitRequestDecision::KeepRunning => {
            append_shutdown_log("all windows closed, keeping app running");
            api.prevent_exit();
        }
        ExitRequestDecision::Teardown => {
            append_shutdown_log(&format!("exit requested: code={exit_code:?}"));
            teardown(app_handle);
        }
    }
}

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    teardown(app_handle);
}

fn teardown(app_handle: &AppHandle) {
    let Some(shell) = app_handle.try_state::<AppShell>() else {
        return;
    };
    shell.mark_quitting();
    if tauri::async_runtime::block_on(shell.teardown()) {
        append_shutdown_log("backend stopped, desktop shell torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_the_last_window_on_macos_keeps_running() {
        assert_eq!(
            decide_exit_request("macos", None, false),
            ExitRequestDecision::KeepRunning
        );
    }

    #[test]
    fn closing_the_last_window_elsewhere_tears_down() {
        for os in ["windows", "linux"] {
            assert_eq!(
                decide_exit_request(os, None, false),
                ExitRequestDecision::Teardown
            );
        }
    }

    #[test]
    fn explicit_exit_always_tears_down() {
        assert_eq!(
            decide_exit_request("macos", Some(0), false),
            ExitRequestDecision::Teardown
        );
        assert_eq!(
            decide_exit_request("macos", None, true),
            ExitRequestDecision::Teardown
        );
    }
}
