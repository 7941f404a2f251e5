//! Reusable retry policy for portal-facing operations.
//!
//! The fetcher and the guide-link locator both retry transient failures;
//! this primitive keeps the attempt accounting and delay math in one place
//! instead of scattering inline loops through each caller.

use std::future::Future;
use std::time::Duration;

use log::debug;

/// Classification contract for retryable errors.
///
/// `escalating_delay` marks error classes where the origin is known to be
/// overloaded (HTTP 502/503/504/505) and the wait should grow linearly with
/// the attempt number instead of staying fixed.
pub trait Retryable {
    fn retryable(&self) -> bool;

    fn escalating_delay(&self) -> bool {
        false
    }
}

/// Fixed-budget retry policy with linear backoff escalation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt (attempts = max_retries + 1)
    pub max_retries: u32,
    /// Base delay between attempts
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay before the next attempt, where `attempt` is the zero-based
    /// index of the attempt that just failed.
    ///
    /// Escalating errors wait `base_delay * (attempt + 1)`; everything else
    /// waits the fixed base delay.
    #[must_use]
    pub fn delay_after(&self, attempt: u32, escalating: bool) -> Duration {
        if escalating {
            self.base_delay * (attempt + 1)
        } else {
            self.base_delay
        }
    }

    /// Run `op` until it succeeds, returns a non-retryable error, or the
    /// attempt budget is exhausted. The closure receives the zero-based
    /// attempt index.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0u32;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable() && attempt < self.max_retries => {
                    let delay = self.delay_after(attempt, e.escalating_delay());
                    debug!(
                        "Attempt {}/{} failed ({e}), retrying in {:.0}s",
                        attempt + 1,
                        self.max_retries + 1,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
