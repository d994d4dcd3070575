use posx_shell_core::{append_desktop_error, DesktopLogCategory};

pub(crate) fn append_startup_log(message: &str) {
    posx_shell_core::append_desktop_log(DesktopLogCategory::Startup, message);
}

pub(crate) fn append_desktop_log(message: &str) {
    posx_shell_core::append_desktop_log(DesktopLogCategory::Runtime, message);
}

pub(crate) fn append_update_log(message: &str) {
    posx_shell_core::append_desktop_log(DesktopLogCategory::Update, message);
}

pub(crate) fn append_shutdown_log(message: &str) {
    posx_shell_core::append_desktop_log(DesktopLogCategory::Shutdown, message);
}

pub(crate) fn append_startup_error(message: &str) {
    append_desktop_error(DesktopLogCategory::Startup, message);
}
