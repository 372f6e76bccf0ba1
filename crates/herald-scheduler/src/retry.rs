//! Bounded exponential retry.

use std::future::Future;
use std::time::Duration;

use herald_core::{Error, Result};
use tokio::time::sleep;
use tracing::warn;

/// Retry bounds: after the first attempt, up to `max_retries` more, waiting
/// `base_delay * multiplier^n` before retry `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never waits; used where retries must stay cheap.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Delay before each retry, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base = self.base_delay;
        let multiplier = self.multiplier;
        (0..self.max_retries).map(move |n| base.saturating_mul(multiplier.saturating_pow(n)))
    }

    /// Longest time a caller can be blocked by retries.
    pub fn total_delay(&self) -> Duration {
        self.delays().fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Runs `op` until it succeeds, fails with an error `should_retry` rejects,
    /// or the retries run out. The last error is returned.
    pub async fn run<T, F, Fut>(
        &self,
        mut op: F,
        should_retry: impl Fn(&Error) -> bool,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let total = self.max_retries + 1;
        let mut delays = self.delays();
        let mut attempt = 1;

        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            warn!(attempt, total, error = %err, "Attempt failed");

            match delays.next() {
                Some(delay) if should_retry(&err) => {
                    sleep(delay).await;
                    attempt += 1;
                }
                _ => return Err(err),
            }
        }
    }
}
