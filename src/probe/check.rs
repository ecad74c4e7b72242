// src/probe/check.rs

//! Pluggable health-check transport.
//!
//! The probe loop talks to a `HealthCheck` instead of an HTTP client
//! directly, so tests can script attempt results without binding sockets.
//! [`HttpHealthCheck`] is the production implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::redirect::Policy;
use tracing::trace;

use crate::errors::{HarnessError, Result};

/// Result of a single health-check attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// The server answered with this HTTP status.
    Status(u16),
    /// No HTTP exchange happened (refused, reset, DNS, ...).
    ConnectionFailed(String),
    /// The transport gave up waiting for an answer.
    TimedOut,
}

/// Trait abstracting how one health-check attempt is issued.
pub trait HealthCheck: Send + Sync {
    fn check<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = AttemptResult> + Send + 'a>>;
}

/// Issues one `HEAD` request per attempt with reqwest.
///
/// Redirects are not followed: a `302` from a login redirect is itself a
/// sign that the application is up.
#[derive(Debug, Clone)]
pub struct HttpHealthCheck {
    client: reqwest::Client,
}

impl HttpHealthCheck {
    pub fn new(attempt_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| HarnessError::Other(anyhow::anyhow!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HealthCheck for HttpHealthCheck {
    fn check<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = AttemptResult> + Send + 'a>> {
        Box::pin(async move {
            match self.client.head(url).send().await {
                Ok(response) => AttemptResult::Status(response.status().as_u16()),
                Err(e) if e.is_timeout() => AttemptResult::TimedOut,
                Err(e) => {
                    trace!(url, error = %e, "health check transport error");
                    AttemptResult::ConnectionFailed(e.to_string())
                }
            }
        })
    }
}
