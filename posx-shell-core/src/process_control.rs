use std::{
    fs::{self, OpenOptions},
    path::Path,
    process::{ExitStatus, Stdio},
    sync::{Arc, OnceLock},
};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::{
    process::{Child, Command},
    sync::oneshot,
    task::JoinHandle,
};

use crate::{
    launch_plan::{BackendStdio, LaunchPlan},
    logging::DesktopLogCategory,
};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("backend working directory {path} does not exist")]
    MissingDir { path: String },
    #[error("failed to prepare backend log {path}")]
    Log {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to spawn backend process {command:?}")]
    Spawn {
        command: Vec<String>,
        #[source]
        source: std::io::Error,
    },
}

/// A live backend child process. Dropping the handle kills the process.
#[derive(Debug)]
pub struct BackendProcessHandle {
    pid: Option<u32>,
    started_at: DateTime<Local>,
    exit: Arc<OnceLock<Option<ExitStatus>>>,
    kill_tx: Option<oneshot::Sender<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl BackendProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn is_running(&self) -> bool {
        self.exit.get().is_none()
    }

    /// `Some(None)` when the process is gone but its status could not be read.
    pub fn exit_status(&self) -> Option<Option<ExitStatus>> {
        self.exit.get().copied()
    }

    /// Kills the process (if still alive) and waits for the watcher to finish.
    pub async fn terminate(mut self) -> Option<ExitStatus> {
        if let Some(kill_tx) = self.kill_tx.take() {
            let _ = kill_tx.send(());
        }
        if let Some(watcher) = self.watcher.take() {
            if let Err(error) = watcher.await {
                tracing::warn!(
                    category = DesktopLogCategory::Shutdown.as_str(),
                    "backend watcher task failed: {error}"
                );
            }
        }
        self.exit.get().copied().flatten()
    }
}

pub fn spawn_backend(plan: &LaunchPlan) -> Result<BackendProcessHandle, SpawnError> {
    if !plan.cwd.is_dir() {
        return Err(SpawnError::MissingDir {
            path: plan.cwd.display().to_string(),
        });
    }

    let mut std_command = std::process::Command::new(&plan.cmd);
    std_command
        .args(&plan.args)
        .current_dir(&plan.cwd)
        .envs(plan.env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        std_command.process_group(0);
    }
    let mut command = Command::from(std_command);
    command.kill_on_drop(true);

    match &plan.stdio {
        BackendStdio::Inherit => {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        BackendStdio::AppendTo(path) => {
            let (stdout, stderr) = open_backend_log(path)?;
            command.stdout(stdout).stderr(stderr);
        }
        BackendStdio::Null => {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    let child = command.spawn().map_err(|source| SpawnError::Spawn {
        command: plan.debug_command(),
        source,
    })?;
    let pid = child.id();
    tracing::info!(
        category = DesktopLogCategory::Startup.as_str(),
        pid = ?pid,
        command = ?plan.debug_command(),
        "backend process spawned"
    );

    let exit = Arc::new(OnceLock::new());
    let (kill_tx, kill_rx) = oneshot::channel();
    let watcher = tokio::spawn(watch_child(child, kill_rx, Arc::clone(&exit)));

    Ok(BackendProcessHandle {
        pid,
        started_at: Local::now(),
        exit,
        kill_tx: Some(kill_tx),
        watcher: Some(watcher),
    })
}

fn open_backend_log(path: &Path) -> Result<(Stdio, Stdio), SpawnError> {
    let log_error = |source| SpawnError::Log {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(log_error)?;
    }
    let stdout = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(log_error)?;
    let stderr = stdout.try_clone().map_err(log_error)?;
    Ok((Stdio::from(stdout), Stdio::from(stderr)))
}

async fn watch_child(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    exit: Arc<OnceLock<Option<ExitStatus>>>,
) {
    let status = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => {
                tracing::warn!(
                    category = DesktopLogCategory::Runtime.as_str(),
                    "backend process exited: {status}"
                );
                Some(status)
            }
            Err(error) => {
                tracing::error!(
                    category = DesktopLogCategory::Runtime.as_str(),
                    "failed to wait on backend process: {error}"
                );
                None
            }
        },
        _ = kill_rx => {
            let status = stop_child_process(&mut child).await;
            tracing::info!(
                category = DesktopLogCategory::Shutdown.as_str(),
                status = ?status,
                "backend process stopped"
            );
            status
        }
    };
    let _ = exit.set(status);
}

#[cfg(target_os = "windows")]
async fn stop_child_process(child: &mut Child) -> Option<ExitStatus> {
    if let Some(pid) = child.id() {
        let _ = Command::new("taskkill")
            .args(["/pid", &pid.to_string(), "/t", "/f"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
    }
    if let Err(error) = child.kill().await {
        tracing::debug!("backend kill after taskkill: {error}");
    }
    child.wait().await.ok()
}

#[cfg(not(target_os = "windows"))]
async fn stop_child_process(child: &mut Child) -> Option<ExitStatus> {
    // The backend leads its own process group; take launcher children down with it.
    if let Some(pid) = child.id() {
        let _ = Command::new("kill")
            .args(["-KILL", "--", &format!("-{pid}")])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
    }
    if let Err(error) = child.kill().await {
        tracing::debug!("backend kill after group kill: {error}");
    }
    child.wait().await.ok()
}

#[cfg(all(test, unix))]
mod tests {
    use std::{path::PathBuf, time::Duration};

    use super::*;

    fn plan(cmd: &str, args: &[&str]) -> LaunchPlan {
        LaunchPlan {
            cmd: cmd.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            cwd: std::env::temp_dir(),
            env: vec![("PORT".to_string(), "3999".to_string())],
            stdio: BackendStdio::Null,
        }
    }

    #[tokio::test]
    async fn terminate_kills_a_running_process() {
        let handle = spawn_backend(&plan("sleep", &["30"])).expect("spawn sleep");
        assert!(handle.pid().is_some());
        assert!(handle.is_running());
        assert!(handle.started_at() <= Local::now());

        let status = handle.terminate().await.expect("status after kill");
        assert!(!status.success());
    }

    #[tokio::test]
    async fn watcher_records_natural_exit() {
        let handle = spawn_backend(&plan("sh", &["-c", "exit 3"])).expect("spawn sh");
        for _ in 0..100 {
            if !handle.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let status = handle.exit_status().flatten().expect("exit recorded");
        assert_eq!(status.code(), Some(3));
    }

    #[tokio::test]
    async fn backend_receives_port_and_writes_to_log_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log_path: PathBuf = dir.path().join("logs").join("backend.log");
        let mut plan = plan("sh", &["-c", "echo port=$PORT"]);
        plan.stdio = BackendStdio::AppendTo(log_path.clone());

        let handle = spawn_backend(&plan).expect("spawn sh");
        for _ in 0..100 {
            if !handle.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let _ = handle.terminate().await;
        assert_eq!(
            fs::read_to_string(log_path).expect("log").trim(),
            "port=3999"
        );
    }

    #[tokio::test]
    async fn missing_working_directory_is_not_created() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("bakend");
        let mut plan = plan("sleep", &["30"]);
        plan.cwd = missing.clone();

        match spawn_backend(&plan).expect_err("missing cwd") {
            SpawnError::MissingDir { path } => assert_eq!(path, missing.display().to_string()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!missing.exists());
    }

    #[tokio::test]
    async fn spawn_failure_names_the_command() {
        let error = spawn_backend(&plan("posx-definitely-missing-binary", &["--serve"]))
            .expect_err("missing binary");
        match error {
            SpawnError::Spawn { command, .. } => {
                assert_eq!(command, vec!["posx-definitely-missing-binary", "--serve"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
