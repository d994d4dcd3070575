use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use thiserror::Error;

use crate::{
    backend_supervisor::{BackendSupervisor, SupervisorError, SupervisorTimings},
    desktop_state::{DesktopStateStore, StateError},
    exit_state::ExitStateMachine,
    health_probe::{HealthProbe, HttpHealthProbe, ProbeError},
    launch_plan::{self, LaunchPlanError},
    logging::DesktopLogCategory,
    shell_config::{ConfigError, ShellConfig},
    update_coordinator::UpdateHandle,
    update_orchestrator::UpdateTrigger,
};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    LaunchPlan(#[from] LaunchPlanError),
    #[error("failed to build health probe client")]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Backend(#[from] SupervisorError),
    #[error("failed to create main window: {0}")]
    Window(String),
    #[error("failed to attach application menu: {0}")]
    Menu(String),
    #[error("launch aborted: application is shutting down")]
    Aborted,
}

/// The windowing side of the application, implemented by the desktop runtime.
pub trait ShellHost: Send + Sync {
    fn create_main_window(&self) -> Result<(), String>;

    fn attach_menu(&self) -> Result<(), String>;
}

/// Process-wide application state: persisted desktop state, the backend
/// supervisor and the shutdown latch.
pub struct AppShell {
    config: ShellConfig,
    state: DesktopStateStore,
    supervisor: tokio::sync::Mutex<BackendSupervisor>,
    exit_state: Mutex<ExitStateMachine>,
    updates: Option<UpdateHandle>,
}

impl AppShell {
    /// Loads persisted state and prepares (but does not start) the backend.
    pub fn new(config: ShellConfig, resource_dir: Option<&Path>) -> Result<Self, ShellError> {
        let state = DesktopStateStore::load(&config.data_dir)?;
        let plan = launch_plan::resolve_launch_plan(&config, resource_dir)?;
        let prober: Arc<dyn HealthProbe> = Arc::new(HttpHealthProbe::new()?);
        let supervisor = BackendSupervisor::new(
            plan,
            config.health_endpoints()?,
            timings_for(&config),
            prober,
        );
        Ok(Self::from_parts(config, state, supervisor))
    }

    pub fn from_parts(
        config: ShellConfig,
        state: DesktopStateStore,
        supervisor: BackendSupervisor,
    ) -> Self {
        Self {
            config,
            state,
            supervisor: tokio::sync::Mutex::new(supervisor),
            exit_state: Mutex::new(ExitStateMachine::default()),
            updates: None,
        }
    }

    pub fn with_updates(mut self, updates: UpdateHandle) -> Self {
        self.updates = Some(updates);
        self
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn state(&self) -> &DesktopStateStore {
        &self.state
    }

    pub fn updates(&self) -> Option<&UpdateHandle> {
        self.updates.as_ref()
    }

    /// Starts the backend, then shows the UI. Each step runs only if the
    /// previous one succeeded; on failure the backend is stopped again.
    pub async fn launch(&self, host: &dyn ShellHost) -> Result<(), ShellError> {
        tracing::info!(
            category = DesktopLogCategory::Startup.as_str(),
            mode = ?self.config.mode,
            strategy = ?self.config.production_strategy,
            port = self.config.backend_port,
            "launching desktop shell"
        );

        {
            // Teardown waits on this lock, so the latch is rechecked under it.
            let mut supervisor = self.supervisor.lock().await;
            if self.is_quitting() {
                return Err(ShellError::Aborted);
            }
            supervisor.start().await?;
            if self.is_quitting() {
                supervisor.stop().await;
                return Err(ShellError::Aborted);
            }
        }

        if self.is_quitting() {
            self.teardown().await;
            return Err(ShellError::Aborted);
        }
        if let Err(error) = host.create_main_window() {
            self.teardown().await;
            return Err(ShellError::Window(error));
        }
        if self.is_quitting() {
            self.teardown().await;
            return Err(ShellError::Aborted);
        }
        if let Err(error) = host.attach_menu() {
            self.teardown().await;
            return Err(ShellError::Menu(error));
        }

        match &self.updates {
            Some(updates) if self.state.auto_update_check_enabled() => {
                updates.request_check(UpdateTrigger::AutomaticInitial);
            }
            Some(_) => tracing::info!(
                category = DesktopLogCategory::Update.as_str(),
                "automatic update check disabled"
            ),
            None => {}
        }
        Ok(())
    }

    pub fn is_quitting(&self) -> bool {
        self.exit_state
            .lock()
            .map(|state| state.is_quitting())
            .unwrap_or(true)
    }

    pub fn mark_quitting(&self) {
        if let Ok(mut state) = self.exit_state.lock() {
            state.mark_quitting();
        }
    }

    pub async fn backend_running(&self) -> bool {
        self.supervisor.lock().await.is_running()
    }

    /// Stops the backend. Only the first call does anything; it returns `true`.
    pub async fn teardown(&self) -> bool {
        let first = self
            .exit_state
            .lock()
            .map(|mut state| state.try_begin_cleanup())
            .unwrap_or(false);
        if !first {
            return false;
        }

        tracing::info!(
            category = DesktopLogCategory::Shutdown.as_str(),
            "tearing down desktop shell"
        );
        if let Some(updates) = &self.updates {
            updates.shutdown();
        }
        self.supervisor.lock().await.stop().await;
        true
    }
}

fn timings_for(config: &ShellConfig) -> SupervisorTimings {
    SupervisorTimings {
        settle_delay: config.settle_delay,
        retry_delay: config.retry_delay,
        probe_timeout: config.probe_timeout,
    }
}
