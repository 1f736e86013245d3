//! Call throttling: retry backoff and concurrency limits
//!
//! The two halves are independent. [`BackoffPolicy`] decides whether a failed
//! call is tried again and when; [`RateLimiter`] decides how many calls run at
//! once, and [`wait_out_rate_limits`] sleeps through server-advertised rate
//! limits for every call, throttled or not. A call retried by the backoff
//! policy goes back through the limiter like any new call.

mod backoff;
mod limiter;

pub use backoff::{
    BackoffPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
    DEFAULT_MULTIPLIER,
};
pub use limiter::{DEFAULT_CONCURRENCY, RateLimiter, wait_out_rate_limits};
