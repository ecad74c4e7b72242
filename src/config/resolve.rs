// src/config/resolve.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::model::{BackendSection, HarnessFile, SuiteSection};
use crate::errors::{HarnessError, Result};
use crate::probe::ProbeConfig;
use crate::types::BackendFlavor;

/// Environment variable that overrides the backend port.
pub const PORT_VAR: &str = "BACKEND_PORT";

/// Environment variable that overrides the health-check path.
pub const HEALTH_PATH_VAR: &str = "HEARTBEAT_PATH";

pub const DEFAULT_PORT: u16 = 8000;

pub const DEFAULT_HEALTH_PATH: &str = "/";

/// Per-invocation choices, usually taken from the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub project_path: PathBuf,
    pub mode: String,
    pub headless: bool,
    pub flavor: BackendFlavor,
    pub spec: Option<String>,
}

/// Everything one run needs, with all precedence rules applied.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub project_path: PathBuf,
    pub mode: String,
    pub headless: bool,
    pub flavor: BackendFlavor,
    pub spec: Option<String>,

    /// Full environment handed to the backend and the suite. Includes the
    /// resolved `BACKEND_PORT` and `HEARTBEAT_PATH`.
    pub env: BTreeMap<String, String>,

    pub backend: BackendSection,
    pub port: u16,
    pub health_path: String,
    pub probe: ProbeConfig,
    pub suite: SuiteSection,
}

impl RunConfig {
    /// Combine command-line options, the harness file and the merged
    /// environment.
    pub fn resolve(
        options: RunOptions,
        file: HarnessFile,
        mut env: BTreeMap<String, String>,
    ) -> Result<Self> {
        if options.project_path.as_os_str().is_empty() {
            return Err(HarnessError::ConfigError(
                "--projectpath must not be empty".to_string(),
            ));
        }

        let port = match env.get(PORT_VAR) {
            Some(raw) => parse_port(raw)?,
            None => file.backend.port.unwrap_or(DEFAULT_PORT),
        };

        let health_path = env
            .get(HEALTH_PATH_VAR)
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .or_else(|| file.backend.health_path.clone())
            .unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string());

        env.insert(PORT_VAR.to_string(), port.to_string());
        env.insert(HEALTH_PATH_VAR.to_string(), health_path.clone());

        let probe = ProbeConfig {
            host: file.backend.host.clone(),
            port,
            path: health_path.clone(),
            attempt_timeout: Duration::from_secs(file.probe.attempt_timeout_secs),
            max_attempts: file.probe.max_attempts,
            backoff: Duration::from_millis(file.probe.backoff_ms),
            accepted_statuses: file.probe.accepted_statuses.clone(),
        };
        probe.validate()?;

        Ok(Self {
            project_path: options.project_path,
            mode: options.mode,
            headless: options.headless,
            flavor: options.flavor,
            spec: options.spec,
            env,
            backend: file.backend,
            port,
            health_path,
            probe,
            suite: file.suite,
        })
    }

    /// Base URL of the backend, e.g. `http://localhost:8000`.
    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", self.backend.host, self.port)
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(HarnessError::ConfigError(format!(
            "{PORT_VAR} must be a port number between 1 and 65535, got '{raw}'"
        ))),
        Ok(port) => Ok(port),
    }
}
