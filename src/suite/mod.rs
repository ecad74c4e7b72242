// src/suite/mod.rs

//! The browser test suite, seen from the harness as a single command that
//! produces an exit code.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tracing::{info, warn};

use crate::config::{RunConfig, SuiteSection};
use crate::errors::{HarnessError, Result};

/// Environment variable carrying the backend base URL to the suite.
pub const BACKEND_URL_VAR: &str = "E2E_BACKEND_URL";

/// What the suite needs to know about the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuiteContext {
    pub env: BTreeMap<String, String>,
    /// e.g. `http://localhost:8000`
    pub backend_url: String,
    pub headless: bool,
    /// Restricts the run to matching spec files.
    pub spec: Option<String>,
    /// Working directory of the suite; the harness's own when `None`.
    pub working_dir: Option<PathBuf>,
}

impl SuiteContext {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            env: cfg.env.clone(),
            backend_url: cfg.backend_url(),
            headless: cfg.headless,
            spec: cfg.spec.clone(),
            working_dir: None,
        }
    }
}

/// Trait abstracting how the test suite is executed.
///
/// Returns the suite's exit code. `Err` is reserved for failures to run the
/// suite at all.
pub trait TestRunner: Send {
    fn run<'a>(
        &'a mut self,
        ctx: &'a SuiteContext,
    ) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>>;
}

/// Runs the suite as an external command, e.g. `npx cypress run --headless`.
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    command: Vec<String>,
    headless_args: Vec<String>,
    interactive_args: Vec<String>,
}

impl CommandTestRunner {
    pub fn new(section: &SuiteSection) -> Self {
        Self {
            command: section.command.clone(),
            headless_args: section.headless_args.clone(),
            interactive_args: section.interactive_args.clone(),
        }
    }

    /// Full argument vector (program first) for `ctx`.
    pub fn argv(&self, ctx: &SuiteContext) -> Vec<String> {
        let mut argv = self.command.clone();
        if ctx.headless {
            argv.extend(self.headless_args.iter().cloned());
        } else {
            argv.extend(self.interactive_args.iter().cloned());
        }
        if let Some(spec) = &ctx.spec {
            argv.push("--spec".to_string());
            argv.push(spec.clone());
        }
        argv
    }
}

impl TestRunner for CommandTestRunner {
    fn run<'a>(
        &'a mut self,
        ctx: &'a SuiteContext,
    ) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>> {
        Box::pin(async move {
            let argv = self.argv(ctx);
            let Some((program, args)) = argv.split_first() else {
                return Err(HarnessError::ConfigError(
                    "test suite command is empty".to_string(),
                ));
            };
            let command_line = argv.join(" ");

            let mut cmd = Command::new(program);
            cmd.args(args)
                .envs(&ctx.env)
                .env(BACKEND_URL_VAR, &ctx.backend_url)
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .kill_on_drop(true);
            if let Some(dir) = &ctx.working_dir {
                cmd.current_dir(dir);
            }

            info!(command = %command_line, "running test suite");
            let status = cmd
                .status()
                .await
                .map_err(|e| HarnessError::SpawnError {
                    command: command_line.clone(),
                    reason: e.to_string(),
                })?;

            let code = exit_code_of(status);
            if code == 0 {
                info!("test suite passed");
            } else {
                warn!(exit_code = code, "test suite failed");
            }
            Ok(code)
        })
    }
}

/// Exit code of a finished process; `128 + signal` when it was killed by a
/// signal.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CommandTestRunner {
        CommandTestRunner::new(&SuiteSection::default())
    }

    #[test]
    fn headless_run_uses_run_subcommand() {
        let ctx = SuiteContext {
            headless: true,
            ..Default::default()
        };
        assert_eq!(runner().argv(&ctx), vec!["npx", "cypress", "run", "--headless"]);
    }

    #[test]
    fn interactive_run_opens_the_runner() {
        let ctx = SuiteContext::default();
        assert_eq!(runner().argv(&ctx), vec!["npx", "cypress", "open"]);
    }

    #[test]
    fn spec_glob_is_forwarded() {
        let ctx = SuiteContext {
            headless: true,
            spec: Some("tests/e2e/specs/login.js".to_string()),
            ..Default::default()
        };
        let argv = runner().argv(&ctx);
        assert_eq!(&argv[argv.len() - 2..], ["--spec", "tests/e2e/specs/login.js"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_code_is_passed_through() {
        let mut runner = CommandTestRunner::new(&SuiteSection {
            command: vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()],
            headless_args: Vec::new(),
            interactive_args: Vec::new(),
        });
        let code = runner.run(&SuiteContext::default()).await.unwrap();
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let mut runner = CommandTestRunner::new(&SuiteSection {
            command: vec!["e2e-harness-no-such-runner".to_string()],
            headless_args: vec!["run".to_string()],
            interactive_args: Vec::new(),
        });
        let ctx = SuiteContext {
            headless: true,
            ..Default::default()
        };
        let err = runner.run(&ctx).await.unwrap_err();
        match err {
            HarnessError::SpawnError { command, .. } => {
                assert_eq!(command, "e2e-harness-no-such-runner run");
            }
            other => panic!("expected SpawnError, got {other:?}"),
        }
    }
}
