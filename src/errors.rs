// src/errors.rs

//! Crate-wide error type and exit-code classification.

use thiserror::Error;

use crate::probe::ProbeOutcome;
use crate::types::{EXIT_CONFIG_FAILURE, EXIT_INFRASTRUCTURE_FAILURE, EXIT_INTERRUPTED};

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Env file error: {0}")]
    EnvFileError(#[from] dotenvy::Error),

    #[error("failed to start `{command}`: {reason}")]
    SpawnError { command: String, reason: String },

    #[error("port {port} on {host} is already accepting connections; refusing to start a second backend")]
    PortInUse { host: String, port: u16 },

    #[error("backend never became ready: {0}")]
    Readiness(ProbeOutcome),

    #[error("failed to terminate process tree of PID {pid}: {reason}")]
    TerminationError { pid: u32, reason: String },

    #[error("interrupted")]
    Interrupted,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HarnessError {
    /// True for failures of the test infrastructure (as opposed to the
    /// configuration or the test suite).
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            HarnessError::SpawnError { .. }
                | HarnessError::PortInUse { .. }
                | HarnessError::Readiness(_)
                | HarnessError::TerminationError { .. }
        )
    }

    /// Process exit code to report for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_infrastructure() => EXIT_INFRASTRUCTURE_FAILURE,
            HarnessError::ConfigError(_)
            | HarnessError::TomlError(_)
            | HarnessError::EnvFileError(_) => EXIT_CONFIG_FAILURE,
            HarnessError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn readiness_failures_are_infrastructure_failures() {
        let outcomes = [
            ProbeOutcome::Unhealthy {
                status: 500,
                attempts: 1,
            },
            ProbeOutcome::TimedOut {
                attempts: 3,
                timeout: Duration::from_secs(1),
            },
            ProbeOutcome::RetriesExhausted {
                attempts: 101,
                last_error: "connection refused".to_string(),
            },
        ];

        for outcome in outcomes {
            let err = HarnessError::Readiness(outcome);
            assert!(err.is_infrastructure());
            assert_eq!(err.exit_code(), EXIT_INFRASTRUCTURE_FAILURE);
        }
    }

    #[test]
    fn config_errors_exit_with_config_code() {
        let err = HarnessError::ConfigError("bad port".to_string());
        assert!(!err.is_infrastructure());
        assert_eq!(err.exit_code(), EXIT_CONFIG_FAILURE);
    }

    #[test]
    fn readiness_message_names_the_terminal_condition() {
        let err = HarnessError::Readiness(ProbeOutcome::Unhealthy {
            status: 500,
            attempts: 1,
        });
        let msg = format!("{err}");
        assert!(msg.contains("500"), "got: {msg}");
        assert!(msg.contains("unhealthy"), "got: {msg}");
    }

    #[test]
    fn other_errors_exit_with_one() {
        let err = HarnessError::Other(anyhow::anyhow!("boom"));
        assert_eq!(err.exit_code(), 1);
        assert_eq!(HarnessError::Interrupted.exit_code(), EXIT_INTERRUPTED);
    }
}
