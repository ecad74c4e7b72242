// src/config/model.rs

use serde::Deserialize;

use crate::types::OutputMode;

/// Harness settings as read from `E2eHarness.toml`.
///
/// ```toml
/// [backend]
/// entrypoint = ["python", "manage.py"]
/// port = 8001
/// health_path = "/healthz"
/// output = "capture"
///
/// [probe]
/// max_attempts = 101
/// backoff_ms = 200
/// attempt_timeout_secs = 120
///
/// [suite]
/// command = ["npx", "cypress"]
/// ```
///
/// Every section is optional and has defaults. This is the raw form; use
/// [`HarnessFile`] (via `TryFrom`) for validated settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHarnessFile {
    #[serde(default)]
    pub backend: BackendSection,

    #[serde(default)]
    pub probe: ProbeSection,

    #[serde(default)]
    pub suite: SuiteSection,
}

/// Validated harness settings.
#[derive(Debug, Clone, Default)]
pub struct HarnessFile {
    pub backend: BackendSection,
    pub probe: ProbeSection,
    pub suite: SuiteSection,
}

impl HarnessFile {
    /// Build without validation. Callers outside `config` should go through
    /// `HarnessFile::try_from(RawHarnessFile)`.
    pub(crate) fn new_unchecked(
        backend: BackendSection,
        probe: ProbeSection,
        suite: SuiteSection,
    ) -> Self {
        Self {
            backend,
            probe,
            suite,
        }
    }
}

/// `[backend]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// Program and leading arguments of the management entrypoint. The
    /// harness appends `runserver --nothreading <port>`.
    #[serde(default = "default_entrypoint")]
    pub entrypoint: Vec<String>,

    /// Host the health check connects to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Backend port. `BACKEND_PORT` in the environment takes precedence.
    #[serde(default)]
    pub port: Option<u16>,

    /// Health-check path. `HEARTBEAT_PATH` in the environment takes
    /// precedence.
    #[serde(default)]
    pub health_path: Option<String>,

    #[serde(default)]
    pub output: OutputMode,
}

fn default_entrypoint() -> Vec<String> {
    vec!["python".to_string(), "manage.py".to_string()]
}

fn default_host() -> String {
    "localhost".to_string()
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            entrypoint: default_entrypoint(),
            host: default_host(),
            port: None,
            health_path: None,
            output: OutputMode::default(),
        }
    }
}

/// `[probe]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSection {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    #[serde(default = "default_accepted_statuses")]
    pub accepted_statuses: Vec<u16>,
}

fn default_max_attempts() -> u32 {
    crate::probe::DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_ms() -> u64 {
    crate::probe::DEFAULT_BACKOFF.as_millis() as u64
}

fn default_attempt_timeout_secs() -> u64 {
    crate::probe::DEFAULT_ATTEMPT_TIMEOUT.as_secs()
}

fn default_accepted_statuses() -> Vec<u16> {
    crate::probe::DEFAULT_ACCEPTED_STATUSES.to_vec()
}

impl Default for ProbeSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            accepted_statuses: default_accepted_statuses(),
        }
    }
}

/// `[suite]` section: how the browser test runner is invoked.
#[derive(Debug, Clone, Deserialize)]
pub struct SuiteSection {
    #[serde(default = "default_suite_command")]
    pub command: Vec<String>,

    /// Appended for `--headless` runs.
    #[serde(default = "default_headless_args")]
    pub headless_args: Vec<String>,

    /// Appended for interactive runs.
    #[serde(default = "default_interactive_args")]
    pub interactive_args: Vec<String>,
}

fn default_suite_command() -> Vec<String> {
    vec!["npx".to_string(), "cypress".to_string()]
}

fn default_headless_args() -> Vec<String> {
    vec!["run".to_string(), "--headless".to_string()]
}

fn default_interactive_args() -> Vec<String> {
    vec!["open".to_string()]
}

impl Default for SuiteSection {
    fn default() -> Self {
        Self {
            command: default_suite_command(),
            headless_args: default_headless_args(),
            interactive_args: default_interactive_args(),
        }
    }
}
