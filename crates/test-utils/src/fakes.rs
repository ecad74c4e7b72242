use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use e2e_harness::errors::{HarnessError, Result};
use e2e_harness::probe::{AttemptResult, HealthCheck};
use e2e_harness::suite::{SuiteContext, TestRunner};

/// One scripted health-check attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(AttemptResult),
    /// Never answer; only the probe's attempt timeout ends the attempt.
    Hang,
}

/// A `HealthCheck` that replays a script.
///
/// - records the instant and URL of every attempt
/// - once the script is exhausted, the last step repeats
///
/// Clones share the script and the records, so a test can keep one clone
/// after moving the other into a probe.
#[derive(Debug, Clone)]
pub struct ScriptedHealthCheck {
    script: Arc<Mutex<VecDeque<Step>>>,
    last: Arc<Mutex<Step>>,
    attempts: Arc<Mutex<Vec<(Instant, String)>>>,
}

impl ScriptedHealthCheck {
    pub fn new(steps: Vec<Step>) -> Self {
        let last = steps
            .last()
            .cloned()
            .unwrap_or(Step::Respond(AttemptResult::ConnectionFailed(
                "connection refused".to_string(),
            )));
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            last: Arc::new(Mutex::new(last)),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// `refused` connection failures, then `status`.
    pub fn refused_then(refused: usize, status: u16) -> Self {
        let mut steps = vec![refused_step(); refused];
        steps.push(Step::Respond(AttemptResult::Status(status)));
        Self::new(steps)
    }

    pub fn always_refused() -> Self {
        Self::new(vec![refused_step()])
    }

    pub fn hangs() -> Self {
        Self::new(vec![Step::Hang])
    }

    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn urls(&self) -> Vec<String> {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }

    /// Smallest gap between two consecutive attempts.
    pub fn min_gap(&self) -> Option<Duration> {
        self.attempt_times()
            .windows(2)
            .map(|w| w[1].duration_since(w[0]))
            .min()
    }

    fn next_step(&self) -> Step {
        match self.script.lock().unwrap().pop_front() {
            Some(step) => step,
            None => self.last.lock().unwrap().clone(),
        }
    }
}

fn refused_step() -> Step {
    Step::Respond(AttemptResult::ConnectionFailed(
        "connection refused".to_string(),
    ))
}

impl HealthCheck for ScriptedHealthCheck {
    fn check<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = AttemptResult> + Send + 'a>> {
        self.attempts
            .lock()
            .unwrap()
            .push((Instant::now(), url.to_string()));
        let step = self.next_step();

        Box::pin(async move {
            match step {
                Step::Respond(result) => result,
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

/// How a `FakeTestRunner` finishes.
#[derive(Debug, Clone)]
pub enum SuiteBehaviour {
    Exit(i32),
    /// Fail to start, like a missing `npx`.
    SpawnFailure,
    /// Never finish; the run has to be interrupted.
    Hang,
}

/// A fake suite that:
/// - records each invocation (context + instant)
/// - finishes as scripted, optionally after a delay
#[derive(Debug, Clone)]
pub struct FakeTestRunner {
    behaviour: SuiteBehaviour,
    delay: Duration,
    invocations: Arc<Mutex<Vec<(Instant, SuiteContext)>>>,
}

impl FakeTestRunner {
    pub fn exiting_with(code: i32) -> Self {
        Self::new(SuiteBehaviour::Exit(code))
    }

    pub fn new(behaviour: SuiteBehaviour) -> Self {
        Self {
            behaviour,
            delay: Duration::ZERO,
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn invocations(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }

    pub fn first_invocation(&self) -> Option<(Instant, SuiteContext)> {
        self.invocations.lock().unwrap().first().cloned()
    }
}

impl TestRunner for FakeTestRunner {
    fn run<'a>(
        &'a mut self,
        ctx: &'a SuiteContext,
    ) -> Pin<Box<dyn Future<Output = Result<i32>> + Send + 'a>> {
        self.invocations
            .lock()
            .unwrap()
            .push((Instant::now(), ctx.clone()));
        let behaviour = self.behaviour.clone();
        let delay = self.delay;

        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match behaviour {
                SuiteBehaviour::Exit(code) => Ok(code),
                SuiteBehaviour::SpawnFailure => Err(HarnessError::SpawnError {
                    command: "npx cypress run".to_string(),
                    reason: "No such file or directory (os error 2)".to_string(),
                }),
                SuiteBehaviour::Hang => std::future::pending().await,
            }
        })
    }
}
