//! The auto-update state machine.
//!
//! [`UpdateOrchestrator::dispatch`] consumes one [`UpdateEvent`] and returns the
//! [`UpdateEffect`]s the caller must carry out. It performs no I/O, so every
//! transition is observable from tests. Events produced by background work
//! (check results, timers, transfer progress) carry the id of the session that
//! started them; events from an older session are dropped.

use crate::{
    logging::DesktopLogCategory,
    update_channel::{
        DownloadProgressSnapshot, InstallChoice, UpdateError, UpdateErrorKind, UpdateInfo,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTrigger {
    /// The silent check issued once at application start.
    AutomaticInitial,
    /// A check the user asked for.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSession {
    pub id: u64,
    pub trigger: UpdateTrigger,
    pub cancelled: bool,
    pub up_to_date_shown: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePhase {
    Idle,
    Checking,
    UpdateAvailable { version: String },
    Downloading { version: String, transfer_started: bool },
    Downloaded { version: String },
    Installing { version: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    CheckRequested(UpdateTrigger),
    CheckFinished {
        session: u64,
        result: Result<Option<UpdateInfo>, UpdateError>,
    },
    DownloadDecision(bool),
    ProgressSurfaceReady,
    DownloadSettled {
        session: u64,
    },
    DownloadProgress {
        session: u64,
        snapshot: DownloadProgressSnapshot,
    },
    DownloadFinished {
        session: u64,
        result: Result<(), UpdateError>,
    },
    ProgressSurfaceClosed,
    CancelDownload,
    InstallDecision(InstallChoice),
    InstallFailed {
        session: u64,
        error: UpdateError,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEffect {
    StartCheck { session: u64 },
    ShowUpToDate,
    NotifyCheckInProgress,
    PromptDownload { info: UpdateInfo },
    OpenProgressSurface,
    ScheduleDownload { session: u64 },
    StartDownload { session: u64 },
    ForwardProgress(DownloadProgressSnapshot),
    CloseProgressSurface,
    PromptInstall { version: String },
    InstallAndRelaunch { session: u64 },
    ShowError(UpdateErrorKind),
}

#[derive(Debug)]
pub struct UpdateOrchestrator {
    current_version: String,
    phase: UpdatePhase,
    session: Option<UpdateSession>,
    next_session_id: u64,
    progress_surface_open: bool,
}

impl UpdateOrchestrator {
    pub fn new(current_version: impl Into<String>) -> Self {
        Self {
            current_version: current_version.into(),
            phase: UpdatePhase::Idle,
            session: None,
            next_session_id: 1,
            progress_surface_open: false,
        }
    }

    pub fn phase(&self) -> &UpdatePhase {
        &self.phase
    }

    /// The active session, or the most recent one once back in `Idle`.
    pub fn session(&self) -> Option<&UpdateSession> {
        self.session.as_ref()
    }

    pub fn progress_surface_open(&self) -> bool {
        self.progress_surface_open
    }

    pub fn dispatch(&mut self, event: UpdateEvent) -> Vec<UpdateEffect> {
        match event {
            UpdateEvent::CheckRequested(trigger) => self.request_check(trigger),
            UpdateEvent::CheckFinished { session, result } => self.finish_check(session, result),
            UpdateEvent::DownloadDecision(accepted) => self.decide_download(accepted),
            UpdateEvent::ProgressSurfaceReady => self.surface_ready(),
            UpdateEvent::DownloadSettled { session } => self.begin_transfer(session),
            UpdateEvent::DownloadProgress { session, snapshot } => {
                if self.transfer_is_live(session) {
                    vec![UpdateEffect::ForwardProgress(snapshot)]
                } else {
                    Vec::new()
                }
            }
            UpdateEvent::DownloadFinished { session, result } => {
                self.finish_download(session, result)
            }
            UpdateEvent::ProgressSurfaceClosed => {
                self.progress_surface_open = false;
                self.cancel_download("progress window closed")
            }
            UpdateEvent::CancelDownload => {
                let mut effects = Vec::new();
                if matches!(self.phase, UpdatePhase::Downloading { .. }) {
                    effects.extend(self.close_surface());
                }
                effects.extend(self.cancel_download("cancel requested"));
                effects
            }
            UpdateEvent::InstallDecision(choice) => self.decide_install(choice),
            UpdateEvent::InstallFailed { session, error } => {
                if self.is_current(session) && matches!(self.phase, UpdatePhase::Installing { .. })
                {
                    self.fail(error)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn request_check(&mut self, trigger: UpdateTrigger) -> Vec<UpdateEffect> {
        if self.phase != UpdatePhase::Idle {
            tracing::info!(
                category = DesktopLogCategory::Update.as_str(),
                phase = ?self.phase,
                ?trigger,
                "update check rejected: another check is in progress"
            );
            return match trigger {
                UpdateTrigger::Manual => vec![UpdateEffect::NotifyCheckInProgress],
                UpdateTrigger::AutomaticInitial => Vec::new(),
            };
        }

        let id = self.next_session_id;
        self.next_session_id += 1;
        self.session = Some(UpdateSession {
            id,
            trigger,
            cancelled: false,
            up_to_date_shown: false,
        });
        self.phase = UpdatePhase::Checking;
        tracing::info!(
            category = DesktopLogCategory::Update.as_str(),
            session = id,
            ?trigger,
            current_version = %self.current_version,
            "checking for updates"
        );
        vec![UpdateEffect::StartCheck { session: id }]
    }

    fn finish_check(
        &mut self,
        session: u64,
        result: Result<Option<UpdateInfo>, UpdateError>,
    ) -> Vec<UpdateEffect> {
        if !self.is_current(session) {
            return Vec::new();
        }
        if self.phase != UpdatePhase::Checking {
            // A late duplicate "up to date" answer is still subject to the guard.
            return match result {
                Ok(None) => self.announce_up_to_date(),
                _ => Vec::new(),
            };
        }

        match result {
            Ok(Some(info)) if info.is_newer_than(&self.current_version) => {
                tracing::info!(
                    category = DesktopLogCategory::Update.as_str(),
                    current_version = %self.current_version,
                    latest_version = %info.version,
                    "update available"
                );
                self.phase = UpdatePhase::UpdateAvailable {
                    version: info.version.clone(),
                };
                vec![UpdateEffect::PromptDownload { info }]
            }
            Ok(_) => {
                tracing::info!(
                    category = DesktopLogCategory::Update.as_str(),
                    current_version = %self.current_version,
                    "already on the latest version"
                );
                self.phase = UpdatePhase::Idle;
                self.announce_up_to_date()
            }
            Err(error) => self.fail(error),
        }
    }

    fn announce_up_to_date(&mut self) -> Vec<UpdateEffect> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.trigger != UpdateTrigger::Manual || session.up_to_date_shown {
            return Vec::new();
        }
        session.up_to_date_shown = true;
        vec![UpdateEffect::ShowUpToDate]
    }

    fn decide_download(&mut self, accepted: bool) -> Vec<UpdateEffect> {
        let UpdatePhase::UpdateAvailable { version } = &self.phase else {
            return Vec::new();
        };
        if !accepted {
            tracing::info!(
                category = DesktopLogCategory::Update.as_str(),
                "user postponed the update download"
            );
            self.phase = UpdatePhase::Idle;
            return Vec::new();
        }

        self.phase = UpdatePhase::Downloading {
            version: version.clone(),
            transfer_started: false,
        };
        if let Some(session) = self.session.as_mut() {
            session.cancelled = false;
        }
        self.progress_surface_open = true;
        vec![UpdateEffect::OpenProgressSurface]
    }

    fn surface_ready(&mut self) -> Vec<UpdateEffect> {
        match (&self.phase, &self.session) {
            (
                UpdatePhase::Downloading {
                    transfer_started: false,
                    ..
                },
                Some(session),
            ) if !session.cancelled => vec![UpdateEffect::ScheduleDownload {
                session: session.id,
            }],
            _ => Vec::new(),
        }
    }

    fn begin_transfer(&mut self, session: u64) -> Vec<UpdateEffect> {
        if !self.is_current(session) || self.is_cancelled() {
            return Vec::new();
        }
        match &mut self.phase {
            UpdatePhase::Downloading {
                transfer_started, ..
            } if !*transfer_started => {
                *transfer_started = true;
                vec![UpdateEffect::StartDownload { session }]
            }
            _ => Vec::new(),
        }
    }

    fn finish_download(
        &mut self,
        session: u64,
        result: Result<(), UpdateError>,
    ) -> Vec<UpdateEffect> {
        if !self.transfer_is_live(session) {
            tracing::info!(
                category = DesktopLogCategory::Update.as_str(),
                session,
                "discarding result of a cancelled or stale download"
            );
            return Vec::new();
        }
        let UpdatePhase::Downloading { version, .. } = &self.phase else {
            return Vec::new();
        };
        let version = version.clone();

        match result {
            Ok(()) => {
                tracing::info!(
                    category = DesktopLogCategory::Update.as_str(),
                    %version,
                    "update downloaded"
                );
                let mut effects = self.close_surface();
                self.phase = UpdatePhase::Downloaded {
                    version: version.clone(),
                };
                effects.push(UpdateEffect::PromptInstall { version });
                effects
            }
            Err(error) => self.fail(error),
        }
    }

    fn cancel_download(&mut self, reason: &str) -> Vec<UpdateEffect> {
        if !matches!(self.phase, UpdatePhase::Downloading { .. }) {
            return Vec::new();
        }
        if let Some(session) = self.session.as_mut() {
            session.cancelled = true;
        }
        tracing::info!(
            category = DesktopLogCategory::Update.as_str(),
            reason,
            "update download cancelled"
        );
        self.phase = UpdatePhase::Idle;
        Vec::new()
    }

    fn decide_install(&mut self, choice: InstallChoice) -> Vec<UpdateEffect> {
        let UpdatePhase::Downloaded { version } = &self.phase else {
            return Vec::new();
        };
        let version = version.clone();
        match (choice, &self.session) {
            (InstallChoice::RestartNow, Some(session)) => {
                let session = session.id;
                tracing::info!(
                    category = DesktopLogCategory::Update.as_str(),
                    %version,
                    "installing update and relaunching"
                );
                self.phase = UpdatePhase::Installing { version };
                vec![UpdateEffect::InstallAndRelaunch { session }]
            }
            _ => {
                tracing::info!(
                    category = DesktopLogCategory::Update.as_str(),
                    %version,
                    "update queued for the next restart"
                );
                self.phase = UpdatePhase::Idle;
                Vec::new()
            }
        }
    }

    /// Any error returns to `Idle`. Only a failed automatic check stays silent.
    fn fail(&mut self, error: UpdateError) -> Vec<UpdateEffect> {
        let silent = self.phase == UpdatePhase::Checking
            && self
                .session
                .as_ref()
                .is_some_and(|session| session.trigger == UpdateTrigger::AutomaticInitial);
        tracing::error!(
            category = DesktopLogCategory::Update.as_str(),
            phase = ?self.phase,
            code = ?error.code,
            kind = ?error.kind(),
            silent,
            "updater error: {error}"
        );

        let mut effects = self.close_surface();
        self.phase = UpdatePhase::Idle;
        if !silent {
            effects.push(UpdateEffect::ShowError(error.kind()));
        }
        effects
    }

    fn close_surface(&mut self) -> Vec<UpdateEffect> {
        if std::mem::take(&mut self.progress_surface_open) {
            vec![UpdateEffect::CloseProgressSurface]
        } else {
            Vec::new()
        }
    }

    fn is_current(&self, session: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|current| current.id == session)
    }

    fn is_cancelled(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.cancelled)
    }

    fn transfer_is_live(&self, session: u64) -> bool {
        self.is_current(session)
            && !self.is_cancelled()
            && matches!(
                self.phase,
                UpdatePhase::Downloading {
                    transfer_started: true,
                    ..
                }
            )
    }
}
