// src/probe/mod.rs

//! Readiness probing.
//!
//! A freshly spawned backend is not usable until it answers HTTP. This
//! module polls a health endpoint until one of four terminal outcomes is
//! reached:
//!
//! - [`ProbeOutcome::Ready`]: an accepted status (200 / 302 by default).
//! - [`ProbeOutcome::Unhealthy`]: any other status. Not retried; the server
//!   is up but broken.
//! - [`ProbeOutcome::TimedOut`]: an attempt got no answer inside the
//!   per-attempt timeout. Not retried; the server is stuck.
//! - [`ProbeOutcome::RetriesExhausted`]: every attempt failed to connect.
//!
//! Only connection failures are retried, because "connection refused" is
//! the normal state of a server that is still booting.
//!
//! - [`check`] holds the [`HealthCheck`] transport seam and the reqwest
//!   implementation used in production.
//! - [`readiness`] holds the retry loop itself.

pub mod check;
pub mod readiness;

use std::fmt;
use std::time::Duration;

use crate::errors::{HarnessError, Result};

pub use check::{AttemptResult, HealthCheck, HttpHealthCheck};
pub use readiness::ReadinessProbe;

/// Parameters of one probe sequence. Not mutated while a probe runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub host: String,
    pub port: u16,
    /// HTTP path of the health endpoint, e.g. `/` or `/healthz`.
    pub path: String,
    /// Upper bound for a single attempt. Cold starts that run database
    /// migrations can take minutes before the first response.
    pub attempt_timeout: Duration,
    /// Total number of attempts (first attempt included), at least 1.
    pub max_attempts: u32,
    /// Fixed delay between a failed connection and the next attempt.
    pub backoff: Duration,
    /// Status codes that mean "ready".
    pub accepted_statuses: Vec<u16>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 101;
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(200);
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2 * 60);
pub const DEFAULT_ACCEPTED_STATUSES: [u16; 2] = [200, 302];

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            path: "/".to_string(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            accepted_statuses: DEFAULT_ACCEPTED_STATUSES.to_vec(),
        }
    }
}

impl ProbeConfig {
    /// Full URL probed on every attempt.
    pub fn url(&self) -> String {
        let path = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("http://{}:{}{}", self.host, self.port, path)
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.accepted_statuses.contains(&status)
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(HarnessError::ConfigError(
                "probe host must not be empty".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(HarnessError::ConfigError(
                "probe max_attempts must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.attempt_timeout.is_zero() {
            return Err(HarnessError::ConfigError(
                "probe attempt timeout must be greater than zero".to_string(),
            ));
        }
        if self.accepted_statuses.is_empty() {
            return Err(HarnessError::ConfigError(
                "probe accepted_statuses must contain at least one status code".to_string(),
            ));
        }
        Ok(())
    }
}

/// Terminal result of a probe sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready { status: u16, attempts: u32 },
    Unhealthy { status: u16, attempts: u32 },
    TimedOut { attempts: u32, timeout: Duration },
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready { .. })
    }

    /// Number of attempts issued before this outcome was reached.
    pub fn attempts(&self) -> u32 {
        match self {
            ProbeOutcome::Ready { attempts, .. }
            | ProbeOutcome::Unhealthy { attempts, .. }
            | ProbeOutcome::TimedOut { attempts, .. }
            | ProbeOutcome::RetriesExhausted { attempts, .. } => *attempts,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Ready { status, attempts } => {
                write!(f, "ready (HTTP {status} after {attempts} attempt(s))")
            }
            ProbeOutcome::Unhealthy { status, attempts } => write!(
                f,
                "unhealthy: health check answered HTTP {status} on attempt {attempts}"
            ),
            ProbeOutcome::TimedOut { attempts, timeout } => write!(
                f,
                "timed out: attempt {attempts} got no response within {timeout:?} (server hung?)"
            ),
            ProbeOutcome::RetriesExhausted {
                attempts,
                last_error,
            } => write!(
                f,
                "retries exhausted: no connection after {attempts} attempt(s), last error: {last_error} (wrong port?)"
            ),
        }
    }
}
