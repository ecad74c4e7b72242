// src/engine/runtime.rs

use std::fmt;

use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::backend::BackendSupervisor;
use crate::errors::{HarnessError, Result};
use crate::probe::HealthCheck;
use crate::process::ProcessHandle;
use crate::suite::{SuiteContext, TestRunner};

use super::RunReport;

/// Drives one e2e run from backend start to backend stop.
///
/// The suite is never started before the backend is ready, and the
/// backend is always stopped once it has been spawned, whether the body
/// succeeded, failed or was interrupted.
pub struct TestRunSupervisor<C: HealthCheck, R: TestRunner> {
    backend: BackendSupervisor<C>,
    runner: R,
    context: SuiteContext,
    shutdown: Option<oneshot::Receiver<()>>,
}

impl<C: HealthCheck, R: TestRunner> fmt::Debug for TestRunSupervisor<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRunSupervisor")
            .field("context", &self.context)
            .field("shutdown", &self.shutdown.is_some())
            .finish_non_exhaustive()
    }
}

impl<C: HealthCheck, R: TestRunner> TestRunSupervisor<C, R> {
    pub fn new(backend: BackendSupervisor<C>, runner: R, context: SuiteContext) -> Self {
        Self {
            backend,
            runner,
            context,
            shutdown: None,
        }
    }

    /// Abort the run (with [`HarnessError::Interrupted`]) when `rx` fires.
    /// A dropped sender is not a shutdown request.
    pub fn with_shutdown(mut self, rx: oneshot::Receiver<()>) -> Self {
        self.shutdown = Some(rx);
        self
    }

    pub async fn run(self) -> RunReport {
        let Self {
            backend,
            mut runner,
            context,
            shutdown,
        } = self;

        info!(backend_url = %context.backend_url, "e2e run started");

        let mut handle = match backend.launch().await {
            Ok(handle) => handle,
            Err(err) => {
                error!(error = %err, "backend could not be started");
                return RunReport::not_started(err);
            }
        };

        let mut report = RunReport {
            backend_pid: Some(handle.pid()),
            ..Default::default()
        };

        let result = tokio::select! {
            result = supervised_body(&backend, &mut runner, &context, &mut handle, &mut report) => result,
            _ = shutdown_requested(shutdown) => {
                warn!("shutdown requested; aborting run");
                Err(HarnessError::Interrupted)
            }
        };

        report.backend_stopped = backend.stop(&mut handle).await;

        match result {
            Ok(code) => {
                report.exit_code = code;
                info!(exit_code = code, "e2e run finished");
            }
            Err(err) => {
                report.exit_code = err.exit_code();
                error!(error = %err, exit_code = report.exit_code, "e2e run failed");
                report.error = Some(err);
            }
        }

        report
    }
}

/// Wait for readiness, then run the suite. Returns the suite's exit code.
async fn supervised_body<C: HealthCheck, R: TestRunner>(
    backend: &BackendSupervisor<C>,
    runner: &mut R,
    context: &SuiteContext,
    handle: &mut ProcessHandle,
    report: &mut RunReport,
) -> Result<i32> {
    let outcome = backend.wait_ready(handle).await.inspect_err(|err| {
        if let HarnessError::Readiness(outcome) = err {
            report.readiness = Some(outcome.clone());
        }
    })?;
    report.readiness = Some(outcome);

    let code = runner.run(context).await?;
    report.suite_exit_code = Some(code);
    Ok(code)
}

async fn shutdown_requested(rx: Option<oneshot::Receiver<()>>) {
    match rx {
        Some(rx) => {
            if rx.await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}
