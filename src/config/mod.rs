// src/config/mod.rs

//! Configuration for a harness run.
//!
//! Responsibilities:
//! - Define the TOML-backed harness file (`model.rs`) and validate it
//!   (`validate.rs`).
//! - Load the harness file through the `FileSystem` abstraction (`loader.rs`).
//! - Merge `.env*` files with the process environment (`env.rs`).
//! - Apply precedence rules and produce a [`RunConfig`] (`resolve.rs`).

pub mod env;
pub mod loader;
pub mod model;
pub mod resolve;
pub mod validate;

pub use env::{load_env_files, merge_process_env};
pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{BackendSection, HarnessFile, ProbeSection, RawHarnessFile, SuiteSection};
pub use resolve::{RunConfig, RunOptions, HEALTH_PATH_VAR, PORT_VAR};
