//! Concurrency limiting with cooperative rate-limit waits

use crate::error::{Error, RateLimitKind, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, warn};

/// Default number of API calls allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Bounds how many operations run at once
///
/// Admission is first-come first-served. When an operation reports a
/// server-side rate limit it gives up its slot, sleeps for the advertised
/// duration and queues again; primary limits are waited out at most three
/// times and secondary limits twice before the error becomes terminal.
///
/// Cloning shares the same pool of slots.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    slots: Arc<Semaphore>,
    limit: usize,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl RateLimiter {
    /// Create a limiter admitting `limit` concurrent operations (minimum 1)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            slots: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Maximum concurrent operations
    pub const fn concurrency_limit(&self) -> usize {
        self.limit
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Stop admitting work. Queued operations fail with [`Error::Cancelled`];
    /// operations already running are unaffected.
    pub fn close(&self) {
        self.slots.close();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Run `operation` once a slot is free.
    ///
    /// The slot is held only while an attempt runs; rate-limit waits happen
    /// outside it, as in [`wait_out_rate_limits`].
    pub async fn schedule<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slots = &self.slots;
        wait_out_rate_limits(|| {
            let attempt = operation();
            async move {
                let _permit = slots
                    .acquire()
                    .await
                    .map_err(|_| Error::Cancelled("rate limiter closed".to_string()))?;
                attempt.await
            }
        })
        .await
    }
}

/// Run `operation`, sleeping out server rate limits between attempts.
///
/// Primary limits are waited out at most three times and secondary limits
/// twice; after that the call fails with [`Error::RateLimitExhausted`]. Any
/// other error is returned as is.
pub async fn wait_out_rate_limits<F, Fut, T>(mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut primary_waits = 0;
    let mut secondary_waits = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let Some((kind, retry_after)) = err.rate_limit() else {
            return Err(err);
        };

        let waits = match kind {
            RateLimitKind::Primary => &mut primary_waits,
            RateLimitKind::Secondary => &mut secondary_waits,
        };
        if *waits >= kind.max_retries() {
            error!(%kind, attempts = *waits + 1, "rate limit retries exhausted");
            return Err(Error::RateLimitExhausted {
                kind,
                attempts: *waits + 1,
            });
        }
        *waits += 1;

        warn!(
            %kind,
            retry_after_secs = retry_after.as_secs_f64(),
            attempt = *waits,
            "rate limit hit, waiting before retry"
        );
        tokio::time::sleep(retry_after).await;
    }
}
