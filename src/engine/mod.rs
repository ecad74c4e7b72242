// src/engine/mod.rs

//! Run orchestration.
//!
//! [`TestRunSupervisor`] sequences one e2e run: launch the backend, wait
//! for readiness, run the suite, stop the backend. The stop step follows
//! the scoped body unconditionally. The outcome of the run is summarized
//! in a [`RunReport`], whose `exit_code` is what the binary exits with.

pub mod runtime;

use crate::errors::HarnessError;
use crate::probe::ProbeOutcome;

pub use runtime::TestRunSupervisor;

/// Summary of one supervised run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Suite exit code on a completed run, otherwise the error's code.
    pub exit_code: i32,
    /// PID of the backend, if it was spawned.
    pub backend_pid: Option<u32>,
    /// Terminal probe outcome, if the probe finished.
    pub readiness: Option<ProbeOutcome>,
    /// Exit code of the suite, if it ran to completion.
    pub suite_exit_code: Option<i32>,
    /// Whether the backend was stopped cleanly. Also true when there was
    /// nothing to stop.
    pub backend_stopped: bool,
    /// Why the run could not complete.
    pub error: Option<HarnessError>,
}

impl RunReport {
    /// Report for a run that failed before any process was started.
    pub(crate) fn not_started(error: HarnessError) -> Self {
        Self {
            exit_code: error.exit_code(),
            backend_stopped: true,
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn suite_invoked(&self) -> bool {
        self.suite_exit_code.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}
