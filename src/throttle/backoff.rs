//! Exponential backoff for transient API failures

use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Retries made after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Upper bound on the un-jittered delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Growth factor between consecutive delays
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Largest fraction of the delay added as random jitter
const MAX_JITTER: f64 = 0.25;

/// Retry schedule for a single API call site
///
/// Only errors for which [`Error::is_retryable`] holds are retried; anything
/// else is returned on first occurrence. Each call site gets its own budget:
/// wrapping a composite operation retries the whole thing, so wrap the
/// individual calls instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Retries made after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on the un-jittered delay
    pub max_delay: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl BackoffPolicy {
    /// Un-jittered wait before retry number `attempt` (1-based).
    ///
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(secs.min(self.max_delay.as_secs_f64()))
    }

    fn jittered_delay(&self, attempt: u32) -> Duration {
        let base = self.delay_for(attempt);
        let jitter = rand::thread_rng().gen_range(0.0..=MAX_JITTER);
        base + base.mul_f64(jitter)
    }

    /// Run `operation`, retrying retryable failures on the backoff schedule.
    ///
    /// `context` names the call site in logs and in the returned error:
    /// [`Error::RetriesExhausted`] once retries run out, [`Error::Operation`]
    /// for anything not worth retrying.
    pub async fn execute<F, Fut, T>(&self, mut operation: F, context: &str) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if attempt > 0 {
                let delay = self.jittered_delay(attempt);
                info!(
                    context,
                    attempt,
                    max_retries = self.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_retryable() {
                debug!(context, error = %err, "error is not retryable");
                return Err(tag(err, context));
            }

            warn!(
                context,
                attempt = attempt + 1,
                total_attempts = self.max_retries + 1,
                error = %err,
                "request failed"
            );

            if attempt >= self.max_retries {
                error!(context, retries = self.max_retries, "all retry attempts failed");
                return Err(Error::RetriesExhausted {
                    context: context.to_string(),
                    retries: self.max_retries,
                    source: Box::new(err),
                });
            }
            attempt += 1;
        }
    }
}

fn tag(err: Error, context: &str) -> Error {
    match err {
        Error::Operation { .. } | Error::RetriesExhausted { .. } => err,
        other => Error::Operation {
            context: context.to_string(),
            source: Box::new(other),
        },
    }
}
