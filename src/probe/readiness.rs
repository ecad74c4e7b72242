// src/probe/readiness.rs

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::{AttemptResult, HealthCheck, ProbeConfig, ProbeOutcome};

/// Polls a health endpoint until a terminal [`ProbeOutcome`] is reached.
#[derive(Debug)]
pub struct ReadinessProbe<C: HealthCheck> {
    config: ProbeConfig,
    check: C,
}

impl<C: HealthCheck> ReadinessProbe<C> {
    pub fn new(config: ProbeConfig, check: C) -> Self {
        Self { config, check }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Run the probe sequence to completion.
    ///
    /// Every arm of the match below ends the sequence except a connection
    /// failure with budget left, which sleeps for `backoff` and loops. No
    /// sleep follows the last attempt.
    pub async fn probe(&self) -> ProbeOutcome {
        let url = self.config.url();
        let mut attempts: u32 = 0;

        info!(
            url = %url,
            max_attempts = self.config.max_attempts,
            "waiting for backend to become ready"
        );

        loop {
            attempts += 1;

            let result = match timeout(self.config.attempt_timeout, self.check.check(&url)).await
            {
                Ok(result) => result,
                Err(_elapsed) => AttemptResult::TimedOut,
            };

            match result {
                AttemptResult::Status(status) if self.config.accepts(status) => {
                    info!(url = %url, status, attempts, "backend is ready");
                    return ProbeOutcome::Ready { status, attempts };
                }
                AttemptResult::Status(status) => {
                    warn!(url = %url, status, attempts, "health check returned a rejected status");
                    return ProbeOutcome::Unhealthy { status, attempts };
                }
                AttemptResult::TimedOut => {
                    warn!(
                        url = %url,
                        attempts,
                        timeout = ?self.config.attempt_timeout,
                        "health check attempt timed out"
                    );
                    return ProbeOutcome::TimedOut {
                        attempts,
                        timeout: self.config.attempt_timeout,
                    };
                }
                AttemptResult::ConnectionFailed(reason) => {
                    if attempts >= self.config.max_attempts {
                        warn!(url = %url, attempts, error = %reason, "retry budget exhausted");
                        return ProbeOutcome::RetriesExhausted {
                            attempts,
                            last_error: reason,
                        };
                    }
                    debug!(
                        url = %url,
                        attempt = attempts,
                        error = %reason,
                        "backend not accepting connections yet"
                    );
                    sleep(self.config.backoff).await;
                }
            }
        }
    }

    /// Like [`probe`](Self::probe), but splits the outcome into ready /
    /// not ready.
    pub async fn wait_until_ready(&self) -> Result<ProbeOutcome, ProbeOutcome> {
        let outcome = self.probe().await;
        if outcome.is_ready() {
            Ok(outcome)
        } else {
            Err(outcome)
        }
    }
}
