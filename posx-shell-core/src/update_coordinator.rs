use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::{
    logging::DesktopLogCategory,
    update_channel::{
        DownloadProgressSnapshot, InstallChoice, ProgressSink, UpdateChannel, UpdateErrorKind,
        UpdateInfo,
    },
    update_orchestrator::{UpdateEffect, UpdateEvent, UpdateOrchestrator, UpdatePhase, UpdateTrigger},
    DOWNLOAD_SETTLE_DELAY,
};

/// User-facing side of the updater: dialogs and the progress window.
#[async_trait]
pub trait UpdateUi: Send + Sync {
    /// Returns `true` to download now, `false` for later.
    async fn confirm_download(&self, update: &UpdateInfo) -> bool;

    async fn show_up_to_date(&self, current_version: &str);

    async fn show_check_in_progress(&self);

    async fn show_update_error(&self, kind: UpdateErrorKind);

    async fn confirm_install(&self, version: &str) -> InstallChoice;

    /// Opens the progress surface. The surface reports back through
    /// [`UpdateHandle::surface_ready`] and [`UpdateHandle::surface_closed`].
    async fn open_progress_surface(&self, handle: &UpdateHandle) -> Result<(), String>;

    async fn close_progress_surface(&self);

    fn publish_progress(&self, snapshot: DownloadProgressSnapshot);
}

#[derive(Debug)]
enum CoordinatorCommand {
    Event(UpdateEvent),
    Shutdown,
}

/// Cloneable entry point into a running [`UpdateCoordinator`].
#[derive(Debug, Clone)]
pub struct UpdateHandle {
    commands: mpsc::UnboundedSender<CoordinatorCommand>,
    phase: watch::Receiver<UpdatePhase>,
}

impl UpdateHandle {
    /// Returns `false` once the coordinator has stopped.
    pub fn send(&self, event: UpdateEvent) -> bool {
        let delivered = self.commands.send(CoordinatorCommand::Event(event)).is_ok();
        if !delivered {
            tracing::debug!(
                category = DesktopLogCategory::Update.as_str(),
                "update coordinator is no longer running; event dropped"
            );
        }
        delivered
    }

    pub fn request_check(&self, trigger: UpdateTrigger) -> bool {
        self.send(UpdateEvent::CheckRequested(trigger))
    }

    pub fn cancel_download(&self) -> bool {
        self.send(UpdateEvent::CancelDownload)
    }

    pub fn surface_ready(&self) -> bool {
        self.send(UpdateEvent::ProgressSurfaceReady)
    }

    pub fn surface_closed(&self) -> bool {
        self.send(UpdateEvent::ProgressSurfaceClosed)
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase.borrow().clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<UpdatePhase> {
        self.phase.clone()
    }

    /// Stops the coordinator after the events already queued.
    pub fn shutdown(&self) {
        let _ = self.commands.send(CoordinatorCommand::Shutdown);
    }
}

/// Runs the update state machine: a single loop applies events in order and
/// carries out the resulting effects. Checks, timers and transfers run as
/// tasks that post their results back as events.
pub struct UpdateCoordinator {
    orchestrator: UpdateOrchestrator,
    channel: Arc<dyn UpdateChannel>,
    ui: Arc<dyn UpdateUi>,
    handle: UpdateHandle,
    commands: mpsc::UnboundedReceiver<CoordinatorCommand>,
    phase_tx: watch::Sender<UpdatePhase>,
    settle_delay: Duration,
}

impl UpdateCoordinator {
    pub fn new(channel: Arc<dyn UpdateChannel>, ui: Arc<dyn UpdateUi>) -> (Self, UpdateHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(UpdatePhase::Idle);
        let handle = UpdateHandle {
            commands: commands_tx,
            phase: phase_rx,
        };
        let coordinator = Self {
            orchestrator: UpdateOrchestrator::new(channel.current_version()),
            channel,
            ui,
            handle: handle.clone(),
            commands,
            phase_tx,
            settle_delay: DOWNLOAD_SETTLE_DELAY,
        };
        (coordinator, handle)
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                CoordinatorCommand::Event(event) => self.apply(event).await,
                CoordinatorCommand::Shutdown => break,
            }
        }
        tracing::debug!(
            category = DesktopLogCategory::Update.as_str(),
            "update coordinator stopped"
        );
    }

    async fn apply(&mut self, event: UpdateEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let effects = self.orchestrator.dispatch(event);
            self.phase_tx.send_replace(self.orchestrator.phase().clone());
            for effect in effects {
                if let Some(follow_up) = self.perform(effect).await {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    async fn perform(&self, effect: UpdateEffect) -> Option<UpdateEvent> {
        match effect {
            UpdateEffect::StartCheck { session } => {
                let channel = Arc::clone(&self.channel);
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let result = channel.check().await;
                    handle.send(UpdateEvent::CheckFinished { session, result });
                });
                None
            }
            UpdateEffect::ShowUpToDate => {
                self.ui
                    .show_up_to_date(&self.channel.current_version())
                    .await;
                None
            }
            UpdateEffect::NotifyCheckInProgress => {
                self.ui.show_check_in_progress().await;
                None
            }
            UpdateEffect::PromptDownload { info } => {
                let accepted = self.ui.confirm_download(&info).await;
                Some(UpdateEvent::DownloadDecision(accepted))
            }
            UpdateEffect::OpenProgressSurface => {
                match self.ui.open_progress_surface(&self.handle).await {
                    Ok(()) => None,
                    Err(error) => {
                        tracing::error!(
                            category = DesktopLogCategory::Update.as_str(),
                            "failed to open update progress window: {error}"
                        );
                        Some(UpdateEvent::ProgressSurfaceClosed)
                    }
                }
            }
            UpdateEffect::ScheduleDownload { session } => {
                let handle = self.handle.clone();
                let delay = self.settle_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    handle.send(UpdateEvent::DownloadSettled { session });
                });
                None
            }
            UpdateEffect::StartDownload { session } => {
                let channel = Arc::clone(&self.channel);
                let handle = self.handle.clone();
                tokio::spawn(async move {
                    let progress_handle = handle.clone();
                    let sink = ProgressSink::new(move |snapshot| {
                        progress_handle.send(UpdateEvent::DownloadProgress { session, snapshot });
                    });
                    let result = channel.download(sink).await;
                    handle.send(UpdateEvent::DownloadFinished { session, result });
                });
                None
            }
            UpdateEffect::ForwardProgress(snapshot) => {
                self.ui.publish_progress(snapshot);
                None
            }
            UpdateEffect::CloseProgressSurface => {
                self.ui.close_progress_surface().await;
                None
            }
            UpdateEffect::PromptInstall { version } => {
                let choice = self.ui.confirm_install(&version).await;
                Some(UpdateEvent::InstallDecision(choice))
            }
            UpdateEffect::InstallAndRelaunch { session } => {
                match self.channel.install_and_relaunch().await {
                    Ok(()) => None,
                    Err(error) => Some(UpdateEvent::InstallFailed { session, error }),
                }
            }
            UpdateEffect::ShowError(kind) => {
                self.ui.show_update_error(kind).await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use tokio::sync::Notify;

    use super::*;
    use crate::update_channel::{UpdateError, UpdateInfo};

    struct FakeChannel {
        current: &'static str,
        latest: Option<&'static str>,
        check_error: Option<UpdateError>,
        check_gate: Option<Notify>,
        download_gate: Option<Notify>,
        download_returned: Notify,
        downloads: AtomicUsize,
        installs: AtomicUsize,
    }

    impl FakeChannel {
        fn new(current: &'static str, latest: Option<&'static str>) -> Self {
            Self {
                current,
                latest,
                check_error: None,
                check_gate: None,
                download_gate: None,
                download_returned: Notify::new(),
                downloads: AtomicUsize::new(0),
                installs: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UpdateChannel for FakeChannel {
        fn current_version(&self) -> String {
            self.current.to_string()
        }

        async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
            if let Some(gate) = &self.check_gate {
                gate.notified().await;
            }
            if let Some(error) = &self.check_error {
                return Err(error.clone());
            }
            Ok(self.latest.map(UpdateInfo::new))
        }

        async fn download(&self, mut progress: ProgressSink) -> Result<(), UpdateError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            progress.record_chunk(500, Some(1_000));
            if let Some(gate) = &self.download_gate {
                gate.notified().await;
            }
            progress.record_chunk(500, Some(1_000));
            self.download_returned.notify_one();
            Ok(())
        }

        async fn install_and_relaunch(&self) -> Result<(), UpdateError> {
            self.installs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Answers prompts from fixed choices and records every UI call.
    struct ScriptedUi {
        accept_download: bool,
        install_choice: InstallChoice,
        cancel_on_first_progress: Option<Arc<FakeChannel>>,
        handle: Mutex<Option<UpdateHandle>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUi {
        fn new(accept_download: bool, install_choice: InstallChoice) -> Self {
            Self {
                accept_download,
                install_choice,
                cancel_on_first_progress: None,
                handle: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: impl Into<String>) {
            self.calls.lock().expect("calls lock").push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl UpdateUi for ScriptedUi {
        async fn confirm_download(&self, update: &UpdateInfo) -> bool {
            self.record(format!("confirm_download {}", update.version));
            self.accept_download
        }

        async fn show_up_to_date(&self, current_version: &str) {
            self.record(format!("up_to_date {current_version}"));
        }

        async fn show_check_in_progress(&self) {
            self.record("check_in_progress");
        }

        async fn show_update_error(&self, kind: UpdateErrorKind) {
            self.record(format!("error {kind:?}"));
        }

        async fn confirm_install(&self, version: &str) -> InstallChoice {
            self.record(format!("confirm_install {version}"));
            self.install_choice
        }

        async fn open_progress_surface(&self, handle: &UpdateHandle) -> Result<(), String> {
            self.record("open_surface");
            *self.handle.lock().expect("handle lock") = Some(handle.clone());
            handle.surface_ready();
            Ok(())
        }

        async fn close_progress_surface(&self) {
            self.record("close_surface");
        }

        fn publish_progress(&self, snapshot: DownloadProgressSnapshot) {
            self.record(format!("progress {}", snapshot.percent));
            if let Some(channel) = &self.cancel_on_first_progress {
                if let Some(handle) = self.handle.lock().expect("handle lock").take() {
                    handle.cancel_download();
                    if let Some(gate) = &channel.download_gate {
                        gate.notify_one();
                    }
                }
            }
        }
    }

    fn start(
        channel: Arc<FakeChannel>,
        ui: Arc<ScriptedUi>,
    ) -> (UpdateHandle, tokio::task::JoinHandle<()>) {
        let (coordinator, handle) = UpdateCoordinator::new(channel, ui);
        let task = tokio::spawn(coordinator.with_settle_delay(Duration::from_millis(1)).run());
        (handle, task)
    }

    async fn wait_for_phase(handle: &UpdateHandle, wanted: impl Fn(&UpdatePhase) -> bool) {
        let mut phase = handle.subscribe_phase();
        tokio::time::timeout(Duration::from_secs(5), phase.wait_for(|phase| wanted(phase)))
            .await
            .expect("phase reached in time")
            .expect("coordinator running");
    }

    /// Waits for the phase to leave `Idle` and come back. The receiver must be
    /// subscribed before the check is requested.
    async fn back_to_idle(mut phase: watch::Receiver<UpdatePhase>) {
        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                phase.changed().await.expect("coordinator running");
                if *phase.borrow_and_update() == UpdatePhase::Idle {
                    break;
                }
            }
        })
        .await
        .expect("back to idle in time");
    }

    #[tokio::test]
    async fn accepted_update_installs_exactly_once() {
        let channel = Arc::new(FakeChannel::new("1.0.0", Some("2.0.0")));
        let ui = Arc::new(ScriptedUi::new(true, InstallChoice::RestartNow));
        let (handle, task) = start(channel.clone(), ui.clone());

        handle.request_check(UpdateTrigger::Manual);
        wait_for_phase(&handle, |phase| matches!(phase, UpdatePhase::Installing { .. })).await;
        handle.shutdown();
        task.await.expect("coordinator task");

        assert_eq!(channel.downloads.load(Ordering::SeqCst), 1);
        assert_eq!(channel.installs.load(Ordering::SeqCst), 1);
        assert_eq!(
            ui.calls(),
            vec![
                "confirm_download 2.0.0",
                "open_surface",
                "progress 50",
                "progress 100",
                "close_surface",
                "confirm_install 2.0.0",
            ]
        );
    }

    #[tokio::test]
    async fn cancelled_download_never_prompts_for_install() {
        let mut fake = FakeChannel::new("1.0.0", Some("2.0.0"));
        fake.download_gate = Some(Notify::new());
        let channel = Arc::new(fake);
        let mut scripted = ScriptedUi::new(true, InstallChoice::RestartNow);
        scripted.cancel_on_first_progress = Some(channel.clone());
        let ui = Arc::new(scripted);
        let (handle, task) = start(channel.clone(), ui.clone());
        let idle_refs = Arc::strong_count(&channel);

        handle.request_check(UpdateTrigger::Manual);
        channel.download_returned.notified().await;
        // The transfer task holds a channel reference until it has queued
        // `DownloadFinished`, so shutdown is queued behind the completion.
        tokio::time::timeout(Duration::from_secs(5), async {
            while Arc::strong_count(&channel) > idle_refs {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transfer task finished");
        handle.shutdown();
        task.await.expect("coordinator task");

        assert_eq!(handle.phase(), UpdatePhase::Idle);
        assert_eq!(channel.installs.load(Ordering::SeqCst), 0);
        let calls = ui.calls();
        assert!(calls.contains(&"close_surface".to_string()));
        assert!(!calls.iter().any(|call| call.starts_with("confirm_install")));
        assert!(!calls.contains(&"progress 100".to_string()));
    }

    #[tokio::test]
    async fn automatic_check_shows_nothing() {
        let channel = Arc::new(FakeChannel::new("1.0.0", None));
        let ui = Arc::new(ScriptedUi::new(true, InstallChoice::Later));
        let (handle, task) = start(channel, ui.clone());

        let phase = handle.subscribe_phase();
        handle.request_check(UpdateTrigger::AutomaticInitial);
        back_to_idle(phase).await;
        handle.shutdown();
        task.await.expect("coordinator task");

        assert!(ui.calls().is_empty());
    }

    #[tokio::test]
    async fn manual_check_failure_is_reported_by_kind() {
        let mut fake = FakeChannel::new("1.0.0", None);
        fake.check_error = Some(UpdateError::with_code("ENOTFOUND", "getaddrinfo ENOTFOUND"));
        let channel = Arc::new(fake);
        let ui = Arc::new(ScriptedUi::new(true, InstallChoice::Later));
        let (handle, task) = start(channel, ui.clone());

        let phase = handle.subscribe_phase();
        handle.request_check(UpdateTrigger::Manual);
        back_to_idle(phase).await;
        handle.shutdown();
        task.await.expect("coordinator task");

        assert_eq!(ui.calls(), vec!["error Network"]);
    }

    #[tokio::test]
    async fn second_manual_check_is_told_to_wait() {
        let mut fake = FakeChannel::new("1.0.0", None);
        fake.check_gate = Some(Notify::new());
        let channel = Arc::new(fake);
        let ui = Arc::new(ScriptedUi::new(true, InstallChoice::Later));
        let (handle, task) = start(channel.clone(), ui.clone());

        handle.request_check(UpdateTrigger::Manual);
        handle.request_check(UpdateTrigger::Manual);
        wait_for_phase(&handle, |phase| *phase == UpdatePhase::Checking).await;
        if let Some(gate) = &channel.check_gate {
            gate.notify_one();
        }
        wait_for_phase(&handle, |phase| *phase == UpdatePhase::Idle).await;
        handle.shutdown();
        task.await.expect("coordinator task");

        assert_eq!(ui.calls(), vec!["check_in_progress", "up_to_date 1.0.0"]);
    }
}
