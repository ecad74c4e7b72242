// src/backend/mod.rs

//! Backend lifecycle: derive the start command, spawn it, wait until the
//! health endpoint answers, and tear it down again.
//!
//! Real and mock backends share one code path. The flavor only changes the
//! environment the backend is started with (`E2E_BACKEND_FLAVOR`), which the
//! project's settings module reads to swap in stub services.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::errors::{HarnessError, Result};
use crate::probe::{HealthCheck, HttpHealthCheck, ProbeOutcome, ReadinessProbe};
use crate::process::{ProcessConfig, ProcessHandle};
use crate::types::{BackendFlavor, OutputMode};

/// Environment variable telling the backend which flavor it runs as.
pub const FLAVOR_VAR: &str = "E2E_BACKEND_FLAVOR";

/// How long the port-in-use check waits for a connection.
const PORT_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

/// Static description of the backend to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Working directory of the backend (`--projectpath`).
    pub project_root: PathBuf,
    /// Program and leading arguments, e.g. `["python", "manage.py"]`.
    pub entrypoint: Vec<String>,
    pub host: String,
    pub port: u16,
    pub flavor: BackendFlavor,
    pub output: OutputMode,
    /// Complete environment of the backend process.
    pub env: BTreeMap<String, String>,
}

impl BackendSettings {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            project_root: cfg.project_path.clone(),
            entrypoint: cfg.backend.entrypoint.clone(),
            host: cfg.backend.host.clone(),
            port: cfg.port,
            flavor: cfg.flavor,
            output: cfg.backend.output,
            env: cfg.env.clone(),
        }
    }
}

/// Starts one backend and waits for it to become ready.
#[derive(Debug)]
pub struct BackendSupervisor<C: HealthCheck> {
    settings: BackendSettings,
    probe: ReadinessProbe<C>,
}

impl BackendSupervisor<HttpHealthCheck> {
    /// Supervisor probing over HTTP with the resolved settings.
    pub fn from_config(cfg: &RunConfig) -> Result<Self> {
        let check = HttpHealthCheck::new(cfg.probe.attempt_timeout)?;
        Ok(Self::new(
            BackendSettings::from_config(cfg),
            ReadinessProbe::new(cfg.probe.clone(), check),
        ))
    }
}

impl<C: HealthCheck> BackendSupervisor<C> {
    pub fn new(settings: BackendSettings, probe: ReadinessProbe<C>) -> Self {
        Self { settings, probe }
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub fn probe(&self) -> &ReadinessProbe<C> {
        &self.probe
    }

    /// `<entrypoint...> runserver --nothreading <port>` in the project root,
    /// with exactly the resolved environment.
    pub fn process_config(&self) -> ProcessConfig {
        let (program, leading) = match self.settings.entrypoint.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => (String::new(), Vec::new()),
        };

        let mut args = leading;
        args.push("runserver".to_string());
        args.push("--nothreading".to_string());
        args.push(self.settings.port.to_string());

        let mut env = self.settings.env.clone();
        env.insert(FLAVOR_VAR.to_string(), self.settings.flavor.as_str().to_string());

        ProcessConfig {
            program,
            args,
            working_dir: Some(self.settings.project_root.clone()),
            env,
            env_clear: true,
            output: self.settings.output,
        }
    }

    /// Spawn the backend without waiting for readiness.
    ///
    /// Refuses with [`HarnessError::PortInUse`] when something already
    /// accepts connections on the configured port, since the probe would
    /// otherwise report that other server as ready.
    pub async fn launch(&self) -> Result<ProcessHandle> {
        self.ensure_port_free().await?;

        let config = self.process_config();
        info!(
            flavor = %self.settings.flavor,
            port = self.settings.port,
            command = %config.display_command(),
            "starting backend"
        );
        ProcessHandle::spawn(&config)
    }

    /// Run the readiness probe while watching the backend process.
    ///
    /// A backend that exits before it is ready fails with
    /// [`HarnessError::SpawnError`]; any terminal probe failure becomes
    /// [`HarnessError::Readiness`]. The process is left running either way.
    pub async fn wait_ready(&self, handle: &mut ProcessHandle) -> Result<ProbeOutcome> {
        let command = handle.command().to_string();

        let startup = tokio::select! {
            outcome = self.probe.probe() => Startup::Probed(outcome),
            status = handle.wait() => Startup::Exited(status),
        };

        match startup {
            Startup::Probed(outcome) if outcome.is_ready() => Ok(outcome),
            Startup::Probed(outcome) => Err(HarnessError::Readiness(outcome)),
            Startup::Exited(status) => {
                let status = status?;
                warn!(command = %command, %status, "backend exited before becoming ready");
                Err(HarnessError::SpawnError {
                    command,
                    reason: format!("exited during startup ({status})"),
                })
            }
        }
    }

    /// Launch the backend and wait until it is ready.
    ///
    /// When readiness fails the backend is stopped before the error is
    /// returned, so the caller never holds a half-started process.
    pub async fn start(&self) -> Result<ProcessHandle> {
        let mut handle = self.launch().await?;
        match self.wait_ready(&mut handle).await {
            Ok(_) => Ok(handle),
            Err(err) => {
                self.stop(&mut handle).await;
                Err(err)
            }
        }
    }

    /// Terminate the backend tree. Returns false when termination failed;
    /// the failure is logged, never raised.
    pub async fn stop(&self, handle: &mut ProcessHandle) -> bool {
        match handle.terminate().await {
            Ok(()) => {
                info!(pid = handle.pid(), "backend stopped");
                true
            }
            Err(err) => {
                warn!(pid = handle.pid(), error = %err, "failed to stop backend");
                false
            }
        }
    }

    async fn ensure_port_free(&self) -> Result<()> {
        let host = self.settings.host.as_str();
        let port = self.settings.port;

        match timeout(PORT_CHECK_TIMEOUT, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Err(HarnessError::PortInUse {
                host: host.to_string(),
                port,
            }),
            Ok(Err(e)) => {
                debug!(host, port, error = %e, "port is free");
                Ok(())
            }
            Err(_elapsed) => {
                debug!(host, port, "port check timed out; assuming free");
                Ok(())
            }
        }
    }
}

enum Startup {
    Probed(ProbeOutcome),
    Exited(Result<ExitStatus>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{AttemptResult, ProbeConfig};
    use std::future::Future;
    use std::pin::Pin;

    struct NeverCalled;

    impl HealthCheck for NeverCalled {
        fn check<'a>(
            &'a self,
            _url: &'a str,
        ) -> Pin<Box<dyn Future<Output = AttemptResult> + Send + 'a>> {
            Box::pin(async { AttemptResult::TimedOut })
        }
    }

    fn settings(flavor: BackendFlavor) -> BackendSettings {
        let mut env = BTreeMap::new();
        env.insert("BACKEND_PORT".to_string(), "8123".to_string());
        BackendSettings {
            project_root: PathBuf::from("/srv/app/backend"),
            entrypoint: vec!["python".to_string(), "manage.py".to_string()],
            host: "localhost".to_string(),
            port: 8123,
            flavor,
            output: OutputMode::Discard,
            env,
        }
    }

    fn supervisor(flavor: BackendFlavor) -> BackendSupervisor<NeverCalled> {
        BackendSupervisor::new(
            settings(flavor),
            ReadinessProbe::new(ProbeConfig::default(), NeverCalled),
        )
    }

    #[test]
    fn start_command_targets_configured_port() {
        let cfg = supervisor(BackendFlavor::Real).process_config();

        assert_eq!(cfg.program, "python");
        assert_eq!(cfg.args, vec!["manage.py", "runserver", "--nothreading", "8123"]);
        assert_eq!(cfg.working_dir, Some(PathBuf::from("/srv/app/backend")));
        assert!(cfg.env_clear);
        assert_eq!(cfg.env["BACKEND_PORT"], "8123");
    }

    #[test]
    fn flavor_is_passed_through_the_environment() {
        let real = supervisor(BackendFlavor::Real).process_config();
        let mock = supervisor(BackendFlavor::Mock).process_config();

        assert_eq!(real.env[FLAVOR_VAR], "real");
        assert_eq!(mock.env[FLAVOR_VAR], "mock");
        assert_eq!(real.args, mock.args);
    }
}
