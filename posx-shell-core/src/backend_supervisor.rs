use std::{sync::Arc, time::Duration};

use chrono::Local;
use thiserror::Error;
use url::Url;

use crate::{
    health_probe::{HealthProbe, ProbeError},
    launch_plan::LaunchPlan,
    logging::DesktopLogCategory,
    process_control::{self, BackendProcessHandle, SpawnError},
};

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The backend could not be spawned at all.
    #[error(transparent)]
    ChildProcess(#[from] SpawnError),
    /// The backend never became healthy.
    #[error("backend did not become healthy at {endpoint}")]
    Startup {
        endpoint: Url,
        #[source]
        source: ProbeError,
    },
}

#[derive(Debug, Clone)]
pub struct SupervisorTimings {
    pub settle_delay: Duration,
    pub retry_delay: Duration,
    pub probe_timeout: Duration,
}

/// Owns at most one backend child process and decides when it is healthy.
pub struct BackendSupervisor {
    plan: Option<LaunchPlan>,
    endpoints: [Url; 2],
    timings: SupervisorTimings,
    prober: Arc<dyn HealthProbe>,
    handle: Option<BackendProcessHandle>,
}

impl BackendSupervisor {
    /// `plan == None` attaches to an externally hosted backend: probe only.
    pub fn new(
        plan: Option<LaunchPlan>,
        endpoints: [Url; 2],
        timings: SupervisorTimings,
        prober: Arc<dyn HealthProbe>,
    ) -> Self {
        Self {
            plan,
            endpoints,
            timings,
            prober,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<&BackendProcessHandle> {
        self.handle.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(BackendProcessHandle::is_running)
    }

    /// Spawns the backend (unless one is already alive), then waits for it to
    /// answer the primary probe or, after one more delay, the fallback probe.
    pub async fn start(&mut self) -> Result<(), SupervisorError> {
        self.spawn_if_needed()?;

        tokio::time::sleep(self.timings.settle_delay).await;
        let [primary, fallback] = self.endpoints.clone();
        match self.prober.probe(&primary, self.timings.probe_timeout).await {
            Ok(()) => {
                tracing::info!(
                    category = DesktopLogCategory::Startup.as_str(),
                    endpoint = %primary,
                    "backend is healthy"
                );
                return Ok(());
            }
            Err(error) => {
                tracing::warn!(
                    category = DesktopLogCategory::Startup.as_str(),
                    endpoint = %primary,
                    "first backend health probe failed, retrying once: {error}"
                );
            }
        }

        tokio::time::sleep(self.timings.retry_delay).await;
        match self.prober.probe(&fallback, self.timings.probe_timeout).await {
            Ok(()) => {
                tracing::info!(
                    category = DesktopLogCategory::Startup.as_str(),
                    endpoint = %fallback,
                    "backend is healthy after retry"
                );
                Ok(())
            }
            Err(source) => {
                tracing::error!(
                    category = DesktopLogCategory::Startup.as_str(),
                    endpoint = %fallback,
                    "backend failed to become healthy: {source}"
                );
                self.stop().await;
                Err(SupervisorError::Startup {
                    endpoint: fallback,
                    source,
                })
            }
        }
    }

    /// Kills the backend if one is owned. Returns whether a process was stopped.
    pub async fn stop(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        let pid = handle.pid();
        let uptime_secs = (Local::now() - handle.started_at()).num_seconds();
        let status = handle.terminate().await;
        tracing::info!(
            category = DesktopLogCategory::Shutdown.as_str(),
            pid = ?pid,
            uptime_secs,
            status = ?status,
            "backend process cleared"
        );
        true
    }

    fn spawn_if_needed(&mut self) -> Result<(), SupervisorError> {
        let Some(plan) = &self.plan else {
            tracing::info!(
                category = DesktopLogCategory::Startup.as_str(),
                "attaching to externally hosted backend"
            );
            return Ok(());
        };

        if let Some(existing) = &self.handle {
            if existing.is_running() {
                tracing::info!(
                    category = DesktopLogCategory::Startup.as_str(),
                    pid = ?existing.pid(),
                    "backend process already running; not spawning another"
                );
                return Ok(());
            }
            tracing::warn!(
                category = DesktopLogCategory::Startup.as_str(),
                exit = ?existing.exit_status(),
                "previous backend process has exited; spawning a new one"
            );
        }

        // Replacing an exited handle drops it, which also reaps its watcher.
        self.handle = Some(process_control::spawn_backend(plan)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Answers probes from a script and records which URLs were probed.
    struct ScriptedProbe {
        answers: Mutex<Vec<bool>>,
        probed: Mutex<Vec<String>>,
    }

    impl ScriptedProbe {
        fn new(answers: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                answers: Mutex::new(answers.iter().rev().copied().collect()),
                probed: Mutex::new(Vec::new()),
            })
        }

        fn probed(&self) -> Vec<String> {
            self.probed.lock().expect("probed lock").clone()
        }
    }

    #[async_trait]
    impl HealthProbe for ScriptedProbe {
        async fn probe(&self, url: &Url, _timeout: Duration) -> Result<(), ProbeError> {
            self.probed.lock().expect("probed lock").push(url.path().to_string());
            let healthy = self.answers.lock().expect("answers lock").pop().unwrap_or(false);
            if healthy {
                Ok(())
            } else {
                Err(ProbeError::Status {
                    url: url.clone(),
                    status: 503,
                })
            }
        }
    }

    fn endpoints() -> [Url; 2] {
        [
            Url::parse("http://127.0.0.1:3000/").expect("url"),
            Url::parse("http://127.0.0.1:3000/api/hello").expect("url"),
        ]
    }

    fn timings() -> SupervisorTimings {
        SupervisorTimings {
            settle_delay: Duration::from_millis(5),
            retry_delay: Duration::from_millis(5),
            probe_timeout: Duration::from_millis(50),
        }
    }

    #[cfg(unix)]
    fn sleeping_backend() -> Option<LaunchPlan> {
        Some(LaunchPlan {
            cmd: "sleep".to_string(),
            args: vec!["30".to_string()],
            cwd: std::env::temp_dir(),
            env: vec![("PORT".to_string(), "3000".to_string())],
            stdio: crate::launch_plan::BackendStdio::Null,
        })
    }

    #[tokio::test]
    async fn attached_backend_is_only_probed() {
        let probe = ScriptedProbe::new(&[true]);
        let mut supervisor = BackendSupervisor::new(None, endpoints(), timings(), probe.clone());

        supervisor.start().await.expect("healthy backend");
        assert!(supervisor.handle().is_none());
        assert_eq!(probe.probed(), vec!["/"]);
        assert!(!supervisor.stop().await);
    }

    #[tokio::test]
    async fn second_probe_hits_the_fallback_endpoint() {
        let probe = ScriptedProbe::new(&[false, true]);
        let mut supervisor = BackendSupervisor::new(None, endpoints(), timings(), probe.clone());

        supervisor.start().await.expect("healthy after retry");
        assert_eq!(probe.probed(), vec!["/", "/api/hello"]);
    }

    #[tokio::test]
    async fn startup_fails_after_exactly_one_retry() {
        let probe = ScriptedProbe::new(&[false, false, true]);
        let mut supervisor = BackendSupervisor::new(None, endpoints(), timings(), probe.clone());

        let error = supervisor.start().await.expect_err("both probes fail");
        match error {
            SupervisorError::Startup { endpoint, .. } => {
                assert_eq!(endpoint.path(), "/api/hello")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(probe.probed().len(), 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn retry_success_keeps_the_spawned_process() {
        let probe = ScriptedProbe::new(&[false, true]);
        let mut supervisor =
            BackendSupervisor::new(sleeping_backend(), endpoints(), timings(), probe);

        supervisor.start().await.expect("healthy after retry");
        assert!(supervisor.is_running());
        assert!(supervisor.stop().await);
        assert!(!supervisor.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_startup_kills_the_spawned_process() {
        let probe = ScriptedProbe::new(&[false, false]);
        let mut supervisor =
            BackendSupervisor::new(sleeping_backend(), endpoints(), timings(), probe);

        assert!(supervisor.start().await.is_err());
        assert!(supervisor.handle().is_none());
        assert!(!supervisor.stop().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn starting_twice_keeps_a_single_process() {
        let probe = ScriptedProbe::new(&[true, true]);
        let mut supervisor =
            BackendSupervisor::new(sleeping_backend(), endpoints(), timings(), probe);

        supervisor.start().await.expect("first start");
        let first_pid = supervisor.handle().and_then(BackendProcessHandle::pid);
        supervisor.start().await.expect("second start");
        let second_pid = supervisor.handle().and_then(BackendProcessHandle::pid);

        assert!(first_pid.is_some());
        assert_eq!(first_pid, second_pid);
        assert!(supervisor.stop().await);
        assert!(!supervisor.stop().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_failure_surfaces_as_child_process_error() {
        let probe = ScriptedProbe::new(&[true]);
        let plan = LaunchPlan {
            cmd: "posx-definitely-missing-binary".to_string(),
            args: Vec::new(),
            cwd: std::env::temp_dir(),
            env: Vec::new(),
            stdio: crate::launch_plan::BackendStdio::Null,
        };
        let mut supervisor =
            BackendSupervisor::new(Some(plan), endpoints(), timings(), probe.clone());

        assert!(matches!(
            supervisor.start().await,
            Err(SupervisorError::ChildProcess(_))
        ));
        assert!(probe.probed().is_empty());
    }
}
