//! Headless core of the POSX desktop shell: backend supervision, persisted
//! desktop state, logging and the auto-update state machine.

mod app_constants;
pub mod app_shell;
pub mod backend_supervisor;
pub mod desktop_state;
pub mod exit_state;
pub mod health_probe;
pub mod launch_plan;
pub mod logging;
pub mod process_control;
pub mod runtime_paths;
pub mod shell_config;
pub mod system_open;
pub mod update_channel;
pub mod update_coordinator;
pub mod update_orchestrator;

pub use app_constants::*;
pub use app_shell::{AppShell, ShellError, ShellHost};
pub use logging::{append_desktop_error, append_desktop_log, init_logging, DesktopLogCategory};
pub use shell_config::{ProductionStrategy, RunMode, ShellConfig};
pub use update_channel::{
    DownloadProgressSnapshot, InstallChoice, ProgressSink, UpdateChannel, UpdateError,
    UpdateErrorKind, UpdateInfo,
};
pub use update_coordinator::{UpdateCoordinator, UpdateHandle, UpdateUi};
pub use update_orchestrator::{UpdatePhase, UpdateTrigger};
