// src/config/validate.rs

use crate::config::model::{HarnessFile, RawHarnessFile};
use crate::errors::{HarnessError, Result};

impl TryFrom<RawHarnessFile> for HarnessFile {
    type Error = HarnessError;

    fn try_from(raw: RawHarnessFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(HarnessFile::new_unchecked(raw.backend, raw.probe, raw.suite))
    }
}

fn validate_raw_config(cfg: &RawHarnessFile) -> Result<()> {
    validate_backend(cfg)?;
    validate_probe(cfg)?;
    validate_suite(cfg)?;
    Ok(())
}

fn validate_backend(cfg: &RawHarnessFile) -> Result<()> {
    if cfg.backend.entrypoint.is_empty() || cfg.backend.entrypoint[0].trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[backend].entrypoint must name a program".to_string(),
        ));
    }
    if cfg.backend.host.trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[backend].host must not be empty".to_string(),
        ));
    }
    if cfg.backend.port == Some(0) {
        return Err(HarnessError::ConfigError(
            "[backend].port must be between 1 and 65535 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_probe(cfg: &RawHarnessFile) -> Result<()> {
    let probe = &cfg.probe;

    if probe.max_attempts == 0 {
        return Err(HarnessError::ConfigError(
            "[probe].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    if probe.attempt_timeout_secs == 0 {
        return Err(HarnessError::ConfigError(
            "[probe].attempt_timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if probe.accepted_statuses.is_empty() {
        return Err(HarnessError::ConfigError(
            "[probe].accepted_statuses must list at least one status code".to_string(),
        ));
    }
    if let Some(bad) = probe
        .accepted_statuses
        .iter()
        .find(|s| !(100..=599).contains(*s))
    {
        return Err(HarnessError::ConfigError(format!(
            "[probe].accepted_statuses contains invalid HTTP status {bad}"
        )));
    }
    Ok(())
}

fn validate_suite(cfg: &RawHarnessFile) -> Result<()> {
    if cfg.suite.command.is_empty() || cfg.suite.command[0].trim().is_empty() {
        return Err(HarnessError::ConfigError(
            "[suite].command must name a program".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<HarnessFile> {
        let raw: RawHarnessFile = toml::from_str(toml_src)?;
        HarnessFile::try_from(raw)
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.backend.entrypoint, vec!["python", "manage.py"]);
        assert_eq!(cfg.backend.host, "localhost");
        assert_eq!(cfg.probe.max_attempts, 101);
        assert_eq!(cfg.probe.backoff_ms, 200);
        assert_eq!(cfg.probe.accepted_statuses, vec![200, 302]);
        assert_eq!(cfg.suite.command, vec!["npx", "cypress"]);
    }

    #[test]
    fn sections_override_defaults() {
        let cfg = parse(
            r#"
[backend]
entrypoint = ["pipenv", "run", "python", "manage.py"]
port = 8123
output = "capture"

[probe]
max_attempts = 5
"#,
        )
        .unwrap();

        assert_eq!(cfg.backend.entrypoint[0], "pipenv");
        assert_eq!(cfg.backend.port, Some(8123));
        assert_eq!(cfg.backend.output, crate::types::OutputMode::Capture);
        assert_eq!(cfg.probe.max_attempts, 5);
        assert_eq!(cfg.probe.attempt_timeout_secs, 120);
    }

    #[test]
    fn empty_entrypoint_is_rejected() {
        let err = parse("[backend]\nentrypoint = []\n").unwrap_err();
        match err {
            HarnessError::ConfigError(msg) => assert!(msg.contains("entrypoint")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_status_is_rejected() {
        let err = parse("[probe]\naccepted_statuses = [200, 42]\n").unwrap_err();
        match err {
            HarnessError::ConfigError(msg) => assert!(msg.contains("42")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn unknown_output_mode_is_a_toml_error() {
        let err = parse("[backend]\noutput = \"buffer\"\n").unwrap_err();
        assert!(matches!(err, HarnessError::TomlError(_)));
    }
}
