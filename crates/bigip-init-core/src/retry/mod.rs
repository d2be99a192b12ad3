//! Bounded fixed-interval retry execution
//!
//! Every remote wait in this tool — readiness polls, task polls, uploads,
//! downloads, availability checks — is a single-shot operation wrapped in
//! this engine with different tunables, never a bespoke polling loop.
//!
//! `max_attempts` counts the first attempt against the bound: a policy of
//! `{max_attempts: 3}` invokes the operation at most three times. The delay
//! between attempts is a fixed interval; there is no jitter and no backoff.
//!
//! # Example
//!
//! ```rust,no_run
//! use bigip_init_core::retry::{retry, RetryError, RetryPolicy};
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let policy = RetryPolicy::new(3, 1000);
//!
//!     retry(&policy, || async {
//!         // Your fallible operation here
//!         Ok("success".to_string())
//!     }).await
//! }
//! ```

mod error;
mod executor;
mod observer;
mod predicate;

use std::time::Duration;

pub use error::RetryError;
pub use executor::{retry, Retrier};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use predicate::{AlwaysRetry, ClosurePredicate, RetryPredicate};

/// Default attempt ceiling when an operation declares none
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default fixed interval between attempts, in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 5_000;

/// Attempt ceiling and fixed interval for one retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, first attempt included
    pub max_attempts: u32,
    /// Fixed wait between attempts, in milliseconds
    pub interval_ms: u64,
}

impl RetryPolicy {
    /// Create a policy with an explicit ceiling and interval
    pub const fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Build a policy from optional per-operation overrides
    pub fn from_overrides(max_attempts: Option<u32>, interval_ms: Option<u64>) -> Self {
        Self {
            max_attempts: max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            interval_ms: interval_ms.unwrap_or(DEFAULT_INTERVAL_MS),
        }
    }

    /// Short-backoff policy for quick local operations (directory creation,
    /// artifact download, chunked upload)
    pub const fn quick() -> Self {
        Self::new(5, 3_000)
    }

    /// Policy for polling an asynchronous device task to a terminal state
    pub const fn task_poll() -> Self {
        Self::new(100, 3_000)
    }

    /// The fixed interval as a `Duration`
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INTERVAL_MS)
    }
}
