use posx_shell_core::ShellHost;
use tauri::AppHandle;

use crate::{append_startup_log, menu_setup, window_actions};

/// Window and menu creation for `AppShell::launch`.
pub(crate) struct TauriShellHost {
    app_handle: AppHandle,
}

impl TauriShellHost {
    pub(crate) fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }
}

impl ShellHost for TauriShellHost {
    fn create_main_window(&self) -> Result<(), String> {
        append_startup_log("creating main window");
        window_actions::create_main_window(&self.app_handle, append_startup_log)
    }

    fn attach_menu(&self) -> Result<(), String> {
        menu_setup::setup_menu(&self.app_handle)
    }
}
