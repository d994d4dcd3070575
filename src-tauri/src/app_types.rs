use posx_shell_core::RunMode;
use serde::Serialize;
use tauri::menu::CheckMenuItem;

#[derive(Clone)]
pub(crate) struct MenuState {
    pub(crate) auto_update_check_item: CheckMenuItem<tauri::Wry>,
}

#[derive(Debug, Serialize)]
pub(crate) struct BridgeResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
}

impl BridgeResult {
    pub(crate) fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppInfo {
    pub(crate) version: String,
    pub(crate) run_mode: RunMode,
    pub(crate) backend_url: String,
    pub(crate) data_dir: String,
    pub(crate) log_dir: Option<String>,
    pub(crate) auto_update_check: bool,
}
