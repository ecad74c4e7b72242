#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use e2e_harness::backend::{BackendSettings, BackendSupervisor};
use e2e_harness::config::{HarnessFile, RawHarnessFile, RunConfig, RunOptions};
use e2e_harness::probe::{HealthCheck, ProbeConfig, ReadinessProbe};
use e2e_harness::types::{BackendFlavor, OutputMode};

/// Builder for `ProbeConfig` with fast defaults for tests.
pub struct ProbeConfigBuilder {
    config: ProbeConfig,
}

impl ProbeConfigBuilder {
    pub fn new(port: u16) -> Self {
        Self {
            config: ProbeConfig {
                host: "127.0.0.1".to_string(),
                port,
                max_attempts: 5,
                backoff: Duration::from_millis(10),
                attempt_timeout: Duration::from_secs(2),
                ..ProbeConfig::default()
            },
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.config.path = path.to_string();
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.config.backoff = backoff;
        self
    }

    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.config.attempt_timeout = timeout;
        self
    }

    pub fn build(self) -> ProbeConfig {
        self.config
    }
}

/// Builder for `BackendSettings`.
///
/// The environment starts with the caller's `PATH` so shell entrypoints
/// resolve even though the backend runs with a cleared environment.
pub struct BackendSettingsBuilder {
    settings: BackendSettings,
}

impl BackendSettingsBuilder {
    pub fn new(port: u16) -> Self {
        let mut env = BTreeMap::new();
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
        Self {
            settings: BackendSettings {
                project_root: std::env::temp_dir(),
                entrypoint: vec!["sh".to_string(), "-c".to_string(), "sleep 30".to_string()],
                host: "127.0.0.1".to_string(),
                port,
                flavor: BackendFlavor::Real,
                output: OutputMode::Discard,
                env,
            },
        }
    }

    /// Use `sh -c <script>` as the entrypoint. The appended
    /// `runserver --nothreading <port>` arguments land in `$0`, `$1`, `$2`.
    pub fn shell(mut self, script: &str) -> Self {
        self.settings.entrypoint = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        self
    }

    pub fn entrypoint(mut self, argv: &[&str]) -> Self {
        self.settings.entrypoint = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.settings.project_root = root.into();
        self
    }

    pub fn flavor(mut self, flavor: BackendFlavor) -> Self {
        self.settings.flavor = flavor;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.settings.output = output;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.settings.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> BackendSettings {
        self.settings
    }

    /// Supervisor over these settings probing with `check`.
    pub fn supervisor<C: HealthCheck>(
        self,
        probe: ProbeConfig,
        check: C,
    ) -> BackendSupervisor<C> {
        BackendSupervisor::new(self.build(), ReadinessProbe::new(probe, check))
    }
}

/// Builder for `RunConfig`, going through the same resolution as the CLI.
pub struct RunConfigBuilder {
    options: RunOptions,
    file: RawHarnessFile,
    env: BTreeMap<String, String>,
}

impl RunConfigBuilder {
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            options: RunOptions {
                project_path: project_path.into(),
                mode: "production".to_string(),
                headless: true,
                flavor: BackendFlavor::Real,
                spec: None,
            },
            file: RawHarnessFile::default(),
            env: BTreeMap::new(),
        }
    }

    pub fn flavor(mut self, flavor: BackendFlavor) -> Self {
        self.options.flavor = flavor;
        self
    }

    pub fn headless(mut self, headless: bool) -> Self {
        self.options.headless = headless;
        self
    }

    pub fn spec(mut self, spec: &str) -> Self {
        self.options.spec = Some(spec.to_string());
        self
    }

    pub fn file_port(mut self, port: u16) -> Self {
        self.file.backend.port = Some(port);
        self
    }

    pub fn entrypoint(mut self, argv: &[&str]) -> Self {
        self.file.backend.entrypoint = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> RunConfig {
        let file = HarnessFile::try_from(self.file).expect("Failed to build valid harness file");
        RunConfig::resolve(self.options, file, self.env).expect("Failed to resolve run config")
    }
}
