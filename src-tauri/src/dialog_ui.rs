use async_trait::async_trait;
use posx_shell_core::{
    DownloadProgressSnapshot, InstallChoice, UpdateErrorKind, UpdateHandle, UpdateInfo, UpdateUi,
};
use tauri::{AppHandle, Emitter};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tokio::sync::oneshot;

use crate::{
    append_update_log, window_actions, window_actions::ProgressWindowOpen, PROGRESS_WINDOW_LABEL,
    UPDATE_PROGRESS_EVENT,
};

const UP_TO_DATE_TITLE: &str = "App is Up to Date";
const UP_TO_DATE_MESSAGE: &str =
    "App is up to date.\n\nYou are already using the latest version of the application.";
const CHECK_FAILED_TITLE: &str = "Update Check Failed";
const NETWORK_ERROR_MESSAGE: &str = "Unable to check for updates.\n\nYour device is not connected to the internet, so we can't check for updates. Please check your internet connection and try again.";
const GENERIC_ERROR_MESSAGE: &str = "Unable to check for updates.\n\nAn error occurred while checking for updates. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DialogContent {
    pub(crate) title: &'static str,
    pub(crate) message: String,
    pub(crate) kind: DialogKind,
    pub(crate) buttons: DialogButtons,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogKind {
    Info,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DialogButtons {
    Ok,
    Choice {
        accept: &'static str,
        decline: &'static str,
    },
}

pub(crate) fn download_prompt(update: &UpdateInfo) -> DialogContent {
    let mut message = format!(
        "A new version ({}) is available. Download it now?",
        update.version
    );
    if let Some(published_at) = &update.published_at {
        message.push_str(&format!("\n\nReleased: {published_at}"));
    }
    let notes = update.notes.as_deref().map(str::trim);
    if let Some(notes) = notes.filter(|notes| !notes.is_empty()) {
        message.push_str(&format!("\n\n{notes}"));
    }
    DialogContent {
        title: "Update Found",
        message,
        kind: DialogKind::Info,
        buttons: DialogButtons::Choice {
            accept: "Download",
            decline: "Later",
        },
    }
}

pub(crate) fn install_prompt(version: &str) -> DialogContent {
    DialogContent {
        title: "Update Ready",
        message: format!("Update downloaded successfully.\n\nRestart now to install version {version}?"),
        kind: DialogKind::Info,
        buttons: DialogButtons::Choice {
            accept: "Restart Now",
            decline: "Later",
        },
    }
}

pub(crate) fn up_to_date_notice(current_version: &str) -> DialogContent {
    DialogContent {
        title: UP_TO_DATE_TITLE,
        message: format!("{UP_TO_DATE_MESSAGE}\n\nCurrent version: {current_version}"),
        kind: DialogKind::Info,
        buttons: DialogButtons::Ok,
    }
}

pub(crate) fn check_in_progress_notice() -> DialogContent {
    DialogContent {
        title: "Checking for Updates",
        message: "An update check is already in progress.".to_string(),
        kind: DialogKind::Info,
        buttons: DialogButtons::Ok,
    }
}

pub(crate) fn error_notice(kind: UpdateErrorKind) -> DialogContent {
    match kind {
        UpdateErrorKind::Network => DialogContent {
            title: CHECK_FAILED_TITLE,
            message: NETWORK_ERROR_MESSAGE.to_string(),
            kind: DialogKind::Info,
            buttons: DialogButtons::Ok,
        },
        UpdateErrorKind::Other => DialogContent {
            title: CHECK_FAILED_TITLE,
            message: GENERIC_ERROR_MESSAGE.to_string(),
            kind: DialogKind::Warning,
            buttons: DialogButtons::Ok,
        },
    }
}

/// `UpdateUi` backed by native message dialogs and the progress webview window.
pub(crate) struct DialogUpdateUi {
    app_handle: AppHandle,
}

impl DialogUpdateUi {
    pub(crate) fn new(app_handle: AppHandle) -> Self {
        Self { app_handle }
    }

    /// Shows the dialog and resolves with whether the accept button was pressed.
    async fn ask(&self, content: DialogContent) -> bool {
        let buttons = match content.buttons {
            DialogButtons::Ok => MessageDialogButtons::Ok,
            DialogButtons::Choice { accept, decline } => {
                MessageDialogButtons::OkCancelCustom(accept.to_string(), decline.to_string())
            }
        };
        let kind = match content.kind {
            DialogKind::Info => MessageDialogKind::Info,
            DialogKind::Warning => MessageDialogKind::Warning,
        };

        let (answer_tx, answer_rx) = oneshot::channel();
        self.app_handle
            .dialog()
            .message(content.message)
            .title(content.title)
            .kind(kind)
            .buttons(buttons)
            .show(move |accepted| {
                let _ = answer_tx.send(accepted);
            });
        answer_rx.await.unwrap_or(false)
    }
}

#[async_trait]
impl UpdateUi for DialogUpdateUi {
    async fn confirm_download(&self, update: &UpdateInfo) -> bool {
        let accepted = self.ask(download_prompt(update)).await;
        append_update_log(&format!(
            "download prompt for {}: {}",
            update.version,
            if accepted { "download" } else { "later" }
        ));
        accepted
    }

    async fn show_up_to_date(&self, current_version: &str) {
        self.ask(up_to_date_notice(current_version)).await;
    }

    async fn show_check_in_progress(&self) {
        self.ask(check_in_progress_notice()).await;
    }

    async fn show_update_error(&self, kind: UpdateErrorKind) {
        self.ask(error_notice(kind)).await;
    }

    async fn confirm_install(&self, version: &str) -> InstallChoice {
        if self.ask(install_prompt(version)).await {
            InstallChoice::RestartNow
        } else {
            InstallChoice::Later
        }
    }

    async fn open_progress_surface(&self, handle: &UpdateHandle) -> Result<(), String> {
        match window_actions::open_progress_window(&self.app_handle, append_update_log)? {
            ProgressWindowOpen::Created => {}
            ProgressWindowOpen::Reused => {
                handle.surface_ready();
            }
        }
        Ok(())
    }

    async fn close_progress_surface(&self) {
        window_actions::close_progress_window(&self.app_handle, append_update_log);
    }

    fn publish_progress(&self, snapshot: DownloadProgressSnapshot) {
        if let Err(error) =
            self.app_handle
                .emit_to(PROGRESS_WINDOW_LABEL, UPDATE_PROGRESS_EVENT, snapshot)
        {
            append_update_log(&format!("failed to publish download progress: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_prompt_names_the_version_and_offers_later() {
        let content = download_prompt(&UpdateInfo::new("2.0.0"));
        assert_eq!(content.title, "Update Found");
        assert!(content.message.contains("(2.0.0)"));
        assert_eq!(
            content.buttons,
            DialogButtons::Choice {
                accept: "Download",
                decline: "Later"
            }
        );
    }

    #[test]
    fn download_prompt_includes_release_details() {
        let update = UpdateInfo {
            notes: Some("  Faster checkout.\n".to_string()),
            published_at: Some("2026-10-01".to_string()),
            ..UpdateInfo::new("2.1.0")
        };
        let content = download_prompt(&update);
        assert!(content.message.contains("Released: 2026-10-01"));
        assert!(content.message.ends_with("Faster checkout."));

        let blank_notes = UpdateInfo {
            notes: Some("   ".to_string()),
            ..UpdateInfo::new("2.1.0")
        };
        assert_eq!(
            download_prompt(&blank_notes).message,
            "A new version (2.1.0) is available. Download it now?"
        );
    }

    #[test]
    fn install_prompt_offers_restart_now() {
        let content = install_prompt("2.0.0");
        assert!(content.message.starts_with("Update downloaded successfully."));
        assert_eq!(
            content.buttons,
            DialogButtons::Choice {
                accept: "Restart Now",
                decline: "Later"
            }
        );
    }

    #[test]
    fn network_errors_get_the_connectivity_message() {
        let network = error_notice(UpdateErrorKind::Network);
        let other = error_notice(UpdateErrorKind::Other);
        assert_eq!(network.title, CHECK_FAILED_TITLE);
        assert_eq!(other.title, CHECK_FAILED_TITLE);
        assert!(network.message.contains("not connected to the internet"));
        assert!(other.message.contains("Please try again later"));
        assert_eq!(network.kind, DialogKind::Info);
        assert_eq!(other.kind, DialogKind::Warning);
    }

    #[test]
    fn up_to_date_notice_is_informational() {
        let content = up_to_date_notice("1.0.0");
        assert_eq!(content.title, UP_TO_DATE_TITLE);
        assert!(content.message.contains("1.0.0"));
        assert_eq!(content.buttons, DialogButtons::Ok);
    }
}
