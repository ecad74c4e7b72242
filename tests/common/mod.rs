#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

#[allow(unused_imports)]
pub use e2e_harness_test_utils::{init_tracing, pid_alive, wait_until_gone, with_timeout};

/// Upper bound for a process tree to disappear after SIGTERM.
pub const GONE_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll for a file written by a shell entrypoint (e.g. a PID file).
pub async fn wait_for_file(path: &Path, timeout: Duration) -> Option<String> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Ok(contents) = std::fs::read_to_string(path) {
            if !contents.trim().is_empty() {
                return Some(contents.trim().to_string());
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
