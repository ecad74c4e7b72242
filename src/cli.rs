// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::BackendFlavor;

/// Command-line arguments for `e2e-harness`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "e2e-harness",
    version,
    about = "Start a backend, wait until it is healthy, run the e2e suite against it and shut it down.",
    long_about = None
)]
pub struct Cli {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `E2E_HARNESS_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Execute e2e tests against a freshly started backend.
    #[command(name = "test:e2e")]
    TestE2e(TestE2eArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TestE2eArgs {
    /// Root directory of the backend project.
    #[arg(long, value_name = "PATH")]
    pub projectpath: PathBuf,

    /// Run the suite without a browser window.
    #[arg(long)]
    pub headless: bool,

    /// Loads the corresponding `.env.<mode>` files.
    #[arg(long, value_name = "MODE", default_value = "production")]
    pub mode: String,

    /// Backend flavor: `real` or `mock`.
    #[arg(long, value_name = "FLAVOR", default_value = "real")]
    pub backend_flavor: BackendFlavor,

    /// Run only the test files matching this glob.
    #[arg(long, value_name = "GLOB")]
    pub spec: Option<String>,

    /// Path to the harness file (TOML).
    ///
    /// Default: `E2eHarness.toml` in the current working directory; a
    /// missing default file means built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the `.env*` files.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub env_dir: PathBuf,

    /// Resolve and print the run plan, but don't start anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `Cli::parse()`.
pub fn parse() -> Cli {
    Cli::parse()
}
