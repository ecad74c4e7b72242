// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{HarnessFile, RawHarnessFile};
use crate::errors::{HarnessError, Result};
use crate::fs::FileSystem;

/// Load a harness file and return the raw, unvalidated settings.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawHarnessFile> {
    let contents = fs.read_to_string(path.as_ref())?;
    let config: RawHarnessFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a harness file and validate it.
pub fn load_and_validate(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<HarnessFile> {
    let raw_config = load_from_path(fs, &path)?;
    let config = HarnessFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the harness file at `path`, falling back to defaults when it does
/// not exist.
///
/// A missing file is only tolerated when `explicit` is false, i.e. the user
/// did not pass `--config` themselves.
pub fn load_or_default(
    fs: &dyn FileSystem,
    path: impl AsRef<Path>,
    explicit: bool,
) -> Result<HarnessFile> {
    let path = path.as_ref();
    if !fs.exists(path) {
        if explicit {
            return Err(HarnessError::ConfigError(format!(
                "harness file {} does not exist",
                path.display()
            )));
        }
        debug!(path = %path.display(), "no harness file found; using defaults");
        return Ok(HarnessFile::default());
    }
    load_and_validate(fs, path)
}

/// Default harness file location (relative to the working directory).
pub fn default_config_path() -> PathBuf {
    PathBuf::from("E2eHarness.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn missing_default_file_yields_defaults() {
        let fs = MockFileSystem::new();
        let cfg = load_or_default(&fs, default_config_path(), false).unwrap();
        assert_eq!(cfg.probe.max_attempts, 101);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let fs = MockFileSystem::new();
        let err = load_or_default(&fs, "custom.toml", true).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigError(_)), "got {err:?}");
    }

    #[test]
    fn existing_file_is_parsed_and_validated() {
        let fs = MockFileSystem::new();
        fs.add_file("E2eHarness.toml", "[probe]\nmax_attempts = 0\n");
        let err = load_or_default(&fs, "E2eHarness.toml", false).unwrap_err();
        assert!(matches!(err, HarnessError::ConfigError(_)));
    }
}
