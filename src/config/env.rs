// src/config/env.rs

//! `.env*` file loading.
//!
//! Files are read from one directory in increasing priority:
//! `.env`, `.env.local`, `.env.<mode>`, `.env.<mode>.local`. Variables from
//! the process environment win over every file.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;

/// Env file names for `mode`, lowest priority first.
pub fn env_file_names(mode: &str) -> Vec<String> {
    vec![
        ".env".to_string(),
        ".env.local".to_string(),
        format!(".env.{mode}"),
        format!(".env.{mode}.local"),
    ]
}

/// Merge every existing env file of `mode` in `dir`. Missing files are
/// skipped; a malformed line fails the whole load.
pub fn load_env_files(
    fs: &dyn FileSystem,
    dir: &Path,
    mode: &str,
) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();

    for name in env_file_names(mode) {
        let path = dir.join(&name);
        if !fs.is_file(&path) {
            debug!(path = %path.display(), "env file not present");
            continue;
        }

        let reader = fs.open_read(&path)?;
        let mut count = 0usize;
        for item in dotenvy::from_read_iter(reader) {
            let (key, value) = item?;
            vars.insert(key, value);
            count += 1;
        }
        debug!(path = %path.display(), count, "loaded env file");
    }

    Ok(vars)
}

/// Overlay the process environment onto the file-derived variables.
pub fn merge_process_env<I>(mut file_vars: BTreeMap<String, String>, process: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    file_vars.extend(process);
    file_vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HarnessError;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn later_files_override_earlier_ones() {
        let fs = MockFileSystem::new();
        fs.add_file("cfg/.env", "A=base\nB=base\nC=base\nD=base\n");
        fs.add_file("cfg/.env.local", "B=local\nC=local\nD=local\n");
        fs.add_file("cfg/.env.test", "C=mode\nD=mode\n");
        fs.add_file("cfg/.env.test.local", "D=mode-local\n");

        let vars = load_env_files(&fs, Path::new("cfg"), "test").unwrap();

        assert_eq!(vars["A"], "base");
        assert_eq!(vars["B"], "local");
        assert_eq!(vars["C"], "mode");
        assert_eq!(vars["D"], "mode-local");
    }

    #[test]
    fn other_modes_are_ignored() {
        let fs = MockFileSystem::new();
        fs.add_file("cfg/.env.production", "ONLY_PROD=1\n");

        let vars = load_env_files(&fs, Path::new("cfg"), "development").unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn missing_directory_yields_empty_mapping() {
        let fs = MockFileSystem::new();
        let vars = load_env_files(&fs, Path::new("nowhere"), "production").unwrap();
        assert!(vars.is_empty());
    }

    #[test]
    fn malformed_line_is_an_env_file_error() {
        let fs = MockFileSystem::new();
        fs.add_file("cfg/.env", "GOOD=1\nthis is not an assignment\n");

        let err = load_env_files(&fs, Path::new("cfg"), "production").unwrap_err();
        assert!(matches!(err, HarnessError::EnvFileError(_)), "got {err:?}");
    }

    #[test]
    fn process_environment_wins() {
        let mut file_vars = BTreeMap::new();
        file_vars.insert("BACKEND_PORT".to_string(), "8001".to_string());
        file_vars.insert("KEEP".to_string(), "file".to_string());

        let merged = merge_process_env(
            file_vars,
            vec![("BACKEND_PORT".to_string(), "9000".to_string())],
        );

        assert_eq!(merged["BACKEND_PORT"], "9000");
        assert_eq!(merged["KEEP"], "file");
    }
}
