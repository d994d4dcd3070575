use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

use crate::{
    shell_config::{ProductionStrategy, RunMode, ShellConfig},
    BACKEND_LOG_FILE, BACKEND_PORT_ENV,
};

const RUNTIME_MANIFEST_PATH: &str = "backend/runtime-manifest.json";
const DEFAULT_ENTRYPOINT: &str = "dist/main.js";

#[derive(Debug, Error)]
pub enum LaunchPlanError {
    #[error("POSX_BACKEND_CMD is empty")]
    EmptyCustomCommand,
    #[error("cannot locate the backend source directory; set POSX_BACKEND_DIR")]
    MissingSourceDir,
    #[error("packaged backend manifest not found under {0}")]
    MissingManifest(PathBuf),
    #[error("failed to read packaged backend manifest {path}")]
    ReadManifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse packaged backend manifest {path}")]
    ParseManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("packaged backend entry point is missing: {0}")]
    MissingEntrypoint(PathBuf),
}

#[derive(Debug, Deserialize)]
struct RuntimeManifest {
    node: Option<String>,
    entrypoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStdio {
    /// Share the shell's stdout/stderr (development).
    Inherit,
    /// Append both streams to this file.
    AppendTo(PathBuf),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdio: BackendStdio,
}

impl LaunchPlan {
    pub fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.cmd.clone()];
        parts.extend(self.args.iter().cloned());
        parts
    }
}

/// `None` means nothing is spawned: the backend is attached to, not owned.
pub fn resolve_launch_plan(
    config: &ShellConfig,
    resource_dir: Option<&Path>,
) -> Result<Option<LaunchPlan>, LaunchPlanError> {
    let port_env = vec![(BACKEND_PORT_ENV.to_string(), config.backend_port.to_string())];

    if let Some(command) = &config.backend_command {
        return resolve_custom_launch(config, command, port_env).map(Some);
    }

    match (config.mode, config.production_strategy) {
        (RunMode::Development, _) => resolve_dev_launch(config, port_env).map(Some),
        (RunMode::Production, ProductionStrategy::ChildProcess) => {
            resolve_packaged_launch(config, resource_dir, port_env).map(Some)
        }
        (RunMode::Production, ProductionStrategy::Attach) => Ok(None),
    }
}

fn resolve_custom_launch(
    config: &ShellConfig,
    command: &[String],
    env: Vec<(String, String)>,
) -> Result<LaunchPlan, LaunchPlanError> {
    let (cmd, args) = command
        .split_first()
        .ok_or(LaunchPlanError::EmptyCustomCommand)?;
    let cwd = config
        .backend_dir
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(LaunchPlan {
        cmd: cmd.clone(),
        args: args.to_vec(),
        cwd,
        env,
        stdio: backend_stdio(config),
    })
}

fn resolve_dev_launch(
    config: &ShellConfig,
    env: Vec<(String, String)>,
) -> Result<LaunchPlan, LaunchPlanError> {
    let cwd = config
        .backend_dir
        .clone()
        .or_else(detect_backend_source_dir)
        .ok_or(LaunchPlanError::MissingSourceDir)?;
    let npm = if cfg!(target_os = "windows") {
        "npm.cmd"
    } else {
        "npm"
    };

    Ok(LaunchPlan {
        cmd: npm.to_string(),
        args: vec!["run".to_string(), "start:dev".to_string()],
        cwd,
        env,
        stdio: BackendStdio::Inherit,
    })
}

fn resolve_packaged_launch(
    config: &ShellConfig,
    resource_dir: Option<&Path>,
    env: Vec<(String, String)>,
) -> Result<LaunchPlan, LaunchPlanError> {
    let resource_dir = resource_dir.unwrap_or_else(|| Path::new("."));
    let manifest_path = resource_dir.join(RUNTIME_MANIFEST_PATH);
    if !manifest_path.is_file() {
        return Err(LaunchPlanError::MissingManifest(resource_dir.to_path_buf()));
    }
    let backend_dir = manifest_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| resource_dir.to_path_buf());

    let manifest_text =
        fs::read_to_string(&manifest_path).map_err(|source| LaunchPlanError::ReadManifest {
            path: manifest_path.clone(),
            source,
        })?;
    let manifest: RuntimeManifest =
        serde_json::from_str(&manifest_text).map_err(|source| LaunchPlanError::ParseManifest {
            path: manifest_path.clone(),
            source,
        })?;

    let entrypoint = backend_dir.join(
        manifest
            .entrypoint
            .as_deref()
            .unwrap_or(DEFAULT_ENTRYPOINT),
    );
    if !entrypoint.is_file() {
        return Err(LaunchPlanError::MissingEntrypoint(entrypoint));
    }

    let node = match manifest.node.as_deref() {
        Some(relative) => backend_dir.join(relative).to_string_lossy().into_owned(),
        None => "node".to_string(),
    };

    Ok(LaunchPlan {
        cmd: node,
        args: vec![entrypoint.to_string_lossy().into_owned()],
        cwd: config.backend_dir.clone().unwrap_or(backend_dir),
        env,
        stdio: backend_stdio(config),
    })
}

fn backend_stdio(config: &ShellConfig) -> BackendStdio {
    match &config.log_dir {
        Some(dir) => BackendStdio::AppendTo(dir.join(BACKEND_LOG_FILE)),
        None => BackendStdio::Null,
    }
}

fn detect_backend_source_dir() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    [cwd.join("backend"), cwd.join("..").join("backend")]
        .into_iter()
        .find(|candidate| candidate.join("package.json").is_file())
        .map(|candidate| candidate.canonicalize().unwrap_or(candidate))
}
