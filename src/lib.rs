// src/lib.rs

pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod probe;
pub mod process;
pub mod suite;
pub mod types;

use tokio::sync::oneshot;
use tracing::debug;

use crate::backend::BackendSupervisor;
use crate::cli::{Cli, Command, TestE2eArgs};
use crate::config::{
    default_config_path, load_env_files, load_or_default, merge_process_env, RunConfig,
    RunOptions,
};
use crate::engine::TestRunSupervisor;
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::probe::HealthCheck;
use crate::suite::{CommandTestRunner, SuiteContext};

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::TestE2e(args) => run_e2e(args).await,
    }
}

/// `test:e2e`: resolve configuration, then supervise one run.
///
/// This wires together:
/// - harness file + env files + process environment
/// - backend supervisor (process + readiness probe)
/// - suite runner
/// - Ctrl-C handling
pub async fn run_e2e(args: TestE2eArgs) -> Result<i32> {
    let cfg = resolve_run_config(&args, &RealFileSystem, process_env())?;

    let backend = BackendSupervisor::from_config(&cfg)?;
    let runner = CommandTestRunner::new(&cfg.suite);
    let context = SuiteContext::from_config(&cfg);

    if args.dry_run {
        print_dry_run(&cfg, &backend, &runner, &context);
        return Ok(0);
    }

    // Ctrl-C → abort the run; the backend is still stopped.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = shutdown_tx.send(());
    });

    let report = TestRunSupervisor::new(backend, runner, context)
        .with_shutdown(shutdown_rx)
        .run()
        .await;

    if let Some(err) = &report.error {
        eprintln!("e2e-harness: {err}");
    }
    Ok(report.exit_code)
}

/// Load the harness file and env files for `args` and apply precedence.
pub fn resolve_run_config<I>(
    args: &TestE2eArgs,
    fs: &dyn FileSystem,
    process_env: I,
) -> Result<RunConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let (config_path, explicit) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (default_config_path(), false),
    };
    let file = load_or_default(fs, &config_path, explicit)?;

    let file_vars = load_env_files(fs, &args.env_dir, &args.mode)?;
    let env = merge_process_env(file_vars, process_env);

    let options = RunOptions {
        project_path: args.projectpath.clone(),
        mode: args.mode.clone(),
        headless: args.headless,
        flavor: args.backend_flavor,
        spec: args.spec.clone(),
    };
    RunConfig::resolve(options, file, env)
}

/// Process environment, skipping entries that are not valid UTF-8.
fn process_env() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Dry-run output: what would be started, probed and run.
fn print_dry_run<C: HealthCheck>(
    cfg: &RunConfig,
    backend: &BackendSupervisor<C>,
    runner: &CommandTestRunner,
    context: &SuiteContext,
) {
    let process = backend.process_config();
    let probe = backend.probe().config();

    println!("e2e-harness dry-run");
    println!("  mode = {}", cfg.mode);
    println!("  flavor = {}", cfg.flavor);
    println!();

    println!("backend:");
    println!("  cmd: {}", process.display_command());
    if let Some(dir) = &process.working_dir {
        println!("  cwd: {}", dir.display());
    }
    println!("  output: {:?}", process.output);
    println!(
        "  env ({}): {}",
        process.env.len(),
        process.env.keys().cloned().collect::<Vec<_>>().join(", ")
    );
    println!();

    println!("readiness:");
    println!("  HEAD {}", probe.url());
    println!("  accepted: {:?}", probe.accepted_statuses);
    println!(
        "  attempts: {} (backoff {:?}, timeout {:?} each)",
        probe.max_attempts, probe.backoff, probe.attempt_timeout
    );
    println!();

    println!("suite:");
    println!("  cmd: {}", runner.argv(context).join(" "));

    debug!("dry-run complete (no execution)");
}
