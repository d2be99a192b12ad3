//! Retry observation and logging
//!
//! The `RetryObserver` trait receives callbacks during retry execution;
//! `TracingObserver` logs them through the `tracing` crate and is the default
//! observer, since logging each failed attempt is part of the retry contract.

use std::error::Error;
use std::time::Duration;

/// Observer for retry attempt events
pub trait RetryObserver: Send + Sync {
    /// Called when an attempt is about to start (1-indexed)
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32);

    /// Called when an attempt fails and will be retried after `delay`
    fn on_attempt_failed(&self, attempt: u32, error: &dyn Error, delay: Duration);

    /// Called when the operation succeeds
    fn on_success(&self, attempt: u32, total_duration: Duration);

    /// Called when the attempt ceiling is reached
    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error);

    /// Called when a predicate stops the retries
    fn on_non_retryable(&self, attempt: u32, error: &dyn Error) {
        let _ = (attempt, error);
    }
}

/// Observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {}

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Error, _delay: Duration) {}

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {}

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Error) {}
}

/// Observer that logs retry events via `tracing`
///
/// Attempt starts log at DEBUG, failures at WARN, exhaustion at ERROR.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried, for log context
    operation: String,
}

impl TracingObserver {
    /// Create a tracing observer named after the operation
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// The operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        tracing::debug!(
            operation = %self.operation,
            attempt = attempt,
            max_attempts = max_attempts,
            "starting attempt"
        );
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Error, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            delay_ms = delay.as_millis() as u64,
            "attempt failed, will retry"
        );
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        if attempt > 1 {
            tracing::info!(
                operation = %self.operation,
                attempt = attempt,
                total_duration_ms = total_duration.as_millis() as u64,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                duration_ms = total_duration.as_millis() as u64,
                "succeeded on first attempt"
            );
        }
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {
        tracing::error!(
            operation = %self.operation,
            attempts = attempts,
            error = %final_error,
            "all retry attempts exhausted"
        );
    }

    fn on_non_retryable(&self, attempt: u32, error: &dyn Error) {
        tracing::warn!(
            operation = %self.operation,
            attempt = attempt,
            error = %error,
            "stopping retries, error is not retryable"
        );
    }
}

/// Observer that counts retry events; used in tests
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Attempt start events
    pub attempt_starts: std::sync::atomic::AtomicU32,
    /// Failed attempt events
    pub failures: std::sync::atomic::AtomicU32,
    /// Success events
    pub successes: std::sync::atomic::AtomicU32,
    /// Exhaustion events
    pub exhaustions: std::sync::atomic::AtomicU32,
    /// Non-retryable stop events
    pub non_retryables: std::sync::atomic::AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attempt starts
    pub fn attempt_starts(&self) -> u32 {
        self.attempt_starts
            .load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of failures
    pub fn failures(&self) -> u32 {
        self.failures.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of exhaustions
    pub fn exhaustions(&self) -> u32 {
        self.exhaustions.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of non-retryable stops
    pub fn non_retryables(&self) -> u32 {
        self.non_retryables
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_attempt_start(&self, _attempt: u32, _max_attempts: u32) {
        self.attempt_starts
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_attempt_failed(&self, _attempt: u32, _error: &dyn Error, _delay: Duration) {
        self.failures
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_success(&self, _attempt: u32, _total_duration: Duration) {
        self.successes
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_exhausted(&self, _attempts: u32, _final_error: &dyn Error) {
        self.exhaustions
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn on_non_retryable(&self, _attempt: u32, _error: &dyn Error) {
        self.non_retryables
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_attempt_start(&self, attempt: u32, max_attempts: u32) {
        (**self).on_attempt_start(attempt, max_attempts)
    }

    fn on_attempt_failed(&self, attempt: u32, error: &dyn Error, delay: Duration) {
        (**self).on_attempt_failed(attempt, error, delay)
    }

    fn on_success(&self, attempt: u32, total_duration: Duration) {
        (**self).on_success(attempt, total_duration)
    }

    fn on_exhausted(&self, attempts: u32, final_error: &dyn Error) {
        (**self).on_exhausted(attempts, final_error)
    }

    fn on_non_retryable(&self, attempt: u32, error: &dyn Error) {
        (**self).on_non_retryable(attempt, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_noop_observer() {
        let observer = NoOpObserver;
        let error = io::Error::other("test");

        observer.on_attempt_start(1, 3);
        observer.on_attempt_failed(1, &error, Duration::from_millis(100));
        observer.on_success(2, Duration::from_millis(500));
        observer.on_exhausted(3, &error);
        observer.on_non_retryable(2, &error);
    }

    #[test]
    fn test_stats_observer() {
        let observer = StatsObserver::new();
        let error = io::Error::other("test");

        observer.on_attempt_start(1, 3);
        observer.on_attempt_start(2, 3);
        observer.on_attempt_failed(1, &error, Duration::from_millis(100));
        observer.on_success(2, Duration::from_millis(500));

        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.failures(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.exhaustions(), 0);
    }

    #[test]
    fn test_arc_observer() {
        let observer = std::sync::Arc::new(StatsObserver::new());
        let error = io::Error::other("test");

        observer.on_attempt_start(1, 3);
        observer.on_attempt_failed(1, &error, Duration::from_millis(100));

        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.failures(), 1);
    }
}
