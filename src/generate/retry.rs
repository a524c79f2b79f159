use std::future::Future;
use std::time::Duration;

use crate::remote::EngineError;

/// Bounded retry for transient remote failures.
///
/// The first few retries wait a long fixed interval (server hiccups tend to
/// clear on their own); once those are spent the wait grows exponentially.
/// Anything that is not a server-side 5xx fails on the first attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Number of leading retries that use the fixed wait.
    pub fixed_retries: u32,
    /// Fixed wait, in wait units.
    pub fixed_wait: u32,
    /// Base of the exponential phase: retry n waits `backoff_base^n` units.
    pub backoff_base: u32,
    /// One unit of waiting. Tests set this to zero.
    pub wait_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            fixed_retries: 3,
            fixed_wait: 30,
            backoff_base: 3,
            wait_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Default budget with zero wait between attempts.
    pub fn immediate() -> Self {
        Self {
            wait_unit: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Wait before the given 1-based retry.
    pub fn delay(&self, retry: u32) -> Duration {
        let units = if retry <= self.fixed_retries {
            self.fixed_wait
        } else {
            self.backoff_base.pow(retry)
        };
        self.wait_unit * units
    }

    /// Run `call` until it succeeds, fails fatally, or the budget is spent.
    pub async fn run<T, F, Fut>(&self, mut call: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let mut attempt: u32 = 1;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let wait = self.delay(attempt);
                    println!(
                        "  transient failure ({}), retrying in {}s (attempt {}/{})",
                        e,
                        wait.as_secs(),
                        attempt + 1,
                        self.max_attempts
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
