// src/process/mod.rs

//! OS process ownership.
//!
//! - [`handle`] owns one spawned child: output routing, exit inspection and
//!   the one-shot process-tree termination.
//! - [`tree`] finds the descendants of a PID and delivers `SIGTERM` to the
//!   whole tree. Backend start commands routinely fork reloaders and worker
//!   processes, so killing only the direct child is not enough.

pub mod handle;
pub mod tree;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::OutputMode;

pub use handle::ProcessHandle;

/// Everything needed to start one process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    /// Variables set on the child. With `env_clear` the child sees exactly
    /// this mapping; otherwise it is layered over the parent environment.
    pub env: BTreeMap<String, String>,
    pub env_clear: bool,
    pub output: OutputMode,
}

impl ProcessConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Program and arguments joined with spaces, for logs and errors.
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_command_joins_program_and_args() {
        let cfg = ProcessConfig {
            args: vec!["manage.py".into(), "runserver".into()],
            ..ProcessConfig::new("python")
        };
        assert_eq!(cfg.display_command(), "python manage.py runserver");
    }
}
