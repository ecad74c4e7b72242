// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Exit code for failures of the test infrastructure itself (backend could
/// not be spawned, never became ready, port already taken).
///
/// Matches `EX_UNAVAILABLE` from `sysexits.h`, so it can be told apart from
/// a test suite that ran and reported a handful of failures.
///
/// The suite's own exit code is passed through unchanged, so a suite that
/// exits with 69 (Cypress exits with the number of failed tests) produces
/// the same process exit code. Library callers tell the two apart with
/// `RunReport::error` and `RunReport::suite_exit_code`.
pub const EXIT_INFRASTRUCTURE_FAILURE: i32 = 69;

/// Exit code for invalid configuration (`EX_CONFIG`).
pub const EXIT_CONFIG_FAILURE: i32 = 78;

/// Exit code used when the run is interrupted with Ctrl-C.
///
/// Same value as a suite killed by SIGINT (`128 + 2`); see
/// [`EXIT_INFRASTRUCTURE_FAILURE`] for how to disambiguate.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Which backend the test run talks to.
///
/// - `Real`: the backend is wired to its real external integrations.
/// - `Mock`: the backend is asked to stub its external integrations.
///
/// Both flavors are started through the same management entrypoint; the
/// flavor is exported to the backend as `E2E_BACKEND_FLAVOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendFlavor {
    Real,
    Mock,
}

impl BackendFlavor {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendFlavor::Real => "real",
            BackendFlavor::Mock => "mock",
        }
    }
}

impl Default for BackendFlavor {
    fn default() -> Self {
        BackendFlavor::Real
    }
}

impl fmt::Display for BackendFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendFlavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "real" => Ok(BackendFlavor::Real),
            "mock" => Ok(BackendFlavor::Mock),
            other => Err(format!(
                "invalid backend flavor: {other} (expected \"real\" or \"mock\")"
            )),
        }
    }
}

/// What happens to the stdout/stderr of a spawned process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Share the parent's stdout/stderr.
    Inherit,
    /// Pipe both streams and re-emit them line by line as `tracing` events.
    Capture,
    /// Send both streams to the null device.
    Discard,
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::Inherit
    }
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inherit" => Ok(OutputMode::Inherit),
            "capture" => Ok(OutputMode::Capture),
            "discard" => Ok(OutputMode::Discard),
            other => Err(format!(
                "invalid output mode: {other} (expected \"inherit\", \"capture\" or \"discard\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_flavor_parses_case_insensitively() {
        assert_eq!("REAL".parse::<BackendFlavor>(), Ok(BackendFlavor::Real));
        assert_eq!(" mock ".parse::<BackendFlavor>(), Ok(BackendFlavor::Mock));
        assert!("stub".parse::<BackendFlavor>().is_err());
    }

    #[test]
    fn output_mode_rejects_unknown_values() {
        assert_eq!("capture".parse::<OutputMode>(), Ok(OutputMode::Capture));
        let err = "buffer".parse::<OutputMode>().unwrap_err();
        assert!(err.contains("buffer"));
    }

    #[test]
    fn infrastructure_exit_code_is_distinct() {
        assert_ne!(EXIT_INFRASTRUCTURE_FAILURE, 0);
        assert_ne!(EXIT_INFRASTRUCTURE_FAILURE, 1);
        assert_ne!(EXIT_INFRASTRUCTURE_FAILURE, EXIT_CONFIG_FAILURE);
    }
}
