use async_trait::async_trait;
use posx_shell_core::{DesktopLogCategory, ProgressSink, UpdateChannel, UpdateError, UpdateInfo};
use tauri::AppHandle;
use tauri_plugin_updater::{Update, UpdaterExt};
use tokio::sync::Mutex;

use crate::append_update_log;

/// `UpdateChannel` over the Tauri updater plugin and its signed release feed.
pub(crate) struct TauriUpdateChannel {
    app_handle: AppHandle,
    pending: Mutex<Option<Update>>,
    downloaded: Mutex<Option<(Update, Vec<u8>)>>,
}

impl TauriUpdateChannel {
    pub(crate) fn new(app_handle: AppHandle) -> Self {
        Self {
            app_handle,
            pending: Mutex::new(None),
            downloaded: Mutex::new(None),
        }
    }
}

#[async_trait]
impl UpdateChannel for TauriUpdateChannel {
    fn current_version(&self) -> String {
        self.app_handle.package_info().version.to_string()
    }

    async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
        let updater = self
            .app_handle
            .updater()
            .map_err(|error| UpdateError::from_error(&error))?;
        let update = updater
            .check()
            .await
            .map_err(|error| UpdateError::from_error(&error))?;

        let info = update.as_ref().map(|update| UpdateInfo {
            version: update.version.clone(),
            notes: update.body.clone(),
            published_at: update.date.map(|date| date.to_string()),
        });
        *self.pending.lock().await = update;
        Ok(info)
    }

    async fn download(&self, mut progress: ProgressSink) -> Result<(), UpdateError> {
        let update = self
            .pending
            .lock()
            .await
            .clone()
            .ok_or_else(|| UpdateError::new("no pending update to download"))?;

        let bytes = update
            .download(
                move |chunk_len, content_length| {
                    progress.record_chunk(chunk_len as u64, content_length)
                },
                || append_update_log("update transfer finished"),
            )
            .await
            .map_err(|error| UpdateError::from_error(&error))?;

        tracing::info!(
            category = DesktopLogCategory::Update.as_str(),
            version = %update.version,
            bytes = bytes.len(),
            "update downloaded"
        );
        *self.downloaded.lock().await = Some((update, bytes));
        Ok(())
    }

    async fn install_and_relaunch(&self) -> Result<(), UpdateError> {
        let Some((update, bytes)) = self.downloaded.lock().await.take() else {
            return Err(UpdateError::new("no downloaded update to install"));
        };

        update
            .install(&bytes)
            .map_err(|error| UpdateError::from_error(&error))?;
        append_update_log(&format!(
            "update {} installed; restarting app",
            update.version
        ));
        self.app_handle.request_restart();
        Ok(())
    }
}
