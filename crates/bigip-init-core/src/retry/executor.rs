//! Retry execution engine

use std::future::Future;
use std::marker::PhantomData;
use std::time::Instant;

use super::error::RetryError;
use super::observer::{RetryObserver, TracingObserver};
use super::predicate::{AlwaysRetry, RetryPredicate};
use super::RetryPolicy;

/// Execute an async operation under a retry policy
///
/// Convenience wrapper around [`Retrier`] with the default predicate and
/// observer.
///
/// # Example
///
/// ```rust,no_run
/// use bigip_init_core::retry::{retry, RetryPolicy};
///
/// async fn example() {
///     let policy = RetryPolicy::new(3, 500);
///
///     let result = retry(&policy, || async {
///         Ok::<_, std::io::Error>("success")
///     }).await;
/// }
/// ```
pub async fn retry<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display + Send + 'static,
{
    Retrier::new(*policy).execute(op).await
}

/// A retry executor with a configurable predicate and observer
///
/// The error type `E` only needs `Display`; observer callbacks receive a
/// formatted wrapper.
pub struct Retrier<E, P = AlwaysRetry, O = TracingObserver> {
    policy: RetryPolicy,
    predicate: P,
    observer: O,
    _phantom: PhantomData<E>,
}

impl<E> Retrier<E, AlwaysRetry, TracingObserver> {
    /// Create a retrier with the default predicate and a tracing observer
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            predicate: AlwaysRetry,
            observer: TracingObserver::default(),
            _phantom: PhantomData,
        }
    }

    /// Create a retrier whose tracing observer is named after the operation
    pub fn named(operation: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            policy,
            predicate: AlwaysRetry,
            observer: TracingObserver::new(operation),
            _phantom: PhantomData,
        }
    }
}

impl<E, P, O> Retrier<E, P, O> {
    /// Replace the retry predicate
    pub fn with_predicate<P2>(self, predicate: P2) -> Retrier<E, P2, O> {
        Retrier {
            policy: self.policy,
            predicate,
            observer: self.observer,
            _phantom: PhantomData,
        }
    }

    /// Replace the observer
    pub fn with_observer<O2>(self, observer: O2) -> Retrier<E, P, O2> {
        Retrier {
            policy: self.policy,
            predicate: self.predicate,
            observer,
            _phantom: PhantomData,
        }
    }
}

impl<E, P, O> Retrier<E, P, O>
where
    E: std::fmt::Display + Send + 'static,
    P: RetryPredicate<E>,
    O: RetryObserver,
{
    /// Execute an operation, retrying per the policy
    ///
    /// Returns the first success, `RetryError::NonRetryable` when the
    /// predicate stops the loop, or `RetryError::Exhausted` carrying the last
    /// error once the attempt ceiling is reached.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        // A zero ceiling would never run the operation; treat it as one shot.
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.observer.on_attempt_start(attempt, max_attempts);

            match op().await {
                Ok(result) => {
                    self.observer.on_success(attempt, start.elapsed());
                    return Ok(result);
                }
                Err(err) => {
                    let display_err = DisplayError(format!("{}", err));

                    if !self.predicate.should_retry(&err) {
                        self.observer.on_non_retryable(attempt, &display_err);
                        return Err(RetryError::non_retryable(err));
                    }

                    if attempt >= max_attempts {
                        self.observer.on_exhausted(attempt, &display_err);
                        return Err(RetryError::exhausted(attempt, err, start.elapsed()));
                    }

                    let delay = self.policy.interval();
                    self.observer.on_attempt_failed(attempt, &display_err, delay);

                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}

/// Wrapper to hand Display-only error types to observer callbacks
#[derive(Debug)]
struct DisplayError(String);

impl std::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for DisplayError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::observer::StatsObserver;
    use crate::retry::predicate::ClosurePredicate;
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_policy() -> RetryPolicy {
        RetryPolicy::new(3, 10)
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<&str, RetryError<io::Error>> = Retrier::new(test_policy())
            .with_observer(observer.clone())
            .execute(|| async { Ok("success") })
            .await;

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "success");
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.successes(), 1);
        assert_eq!(observer.failures(), 0);
    }

    #[tokio::test]
    async fn test_success_after_retry() {
        let observer = Arc::new(StatsObserver::new());
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<&str, RetryError<io::Error>> = Retrier::new(test_policy())
            .with_observer(observer.clone())
            .execute(|| {
                let attempts = attempts_clone.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 2 {
                        Err(io::Error::new(io::ErrorKind::TimedOut, "timeout"))
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(observer.attempt_starts(), 2);
        assert_eq!(observer.failures(), 1);
        assert_eq!(observer.successes(), 1);
    }

    #[tokio::test]
    async fn test_attempt_ceiling_counts_first_attempt() {
        let policy = RetryPolicy::new(4, 25);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();
        let start = Instant::now();

        let result: Result<&str, RetryError<io::Error>> = retry(&policy, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::new(io::ErrorKind::TimedOut, "always fails"))
            }
        })
        .await;

        // Exactly max_attempts invocations, and the waits between them add
        // up to at least (max_attempts - 1) * interval.
        assert!(result.is_err());
        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_millis(3 * 25));
    }

    #[tokio::test]
    async fn test_all_attempts_exhausted() {
        let observer = Arc::new(StatsObserver::new());

        let result: Result<&str, RetryError<io::Error>> = Retrier::new(test_policy())
            .with_observer(observer.clone())
            .execute(|| async { Err(io::Error::new(io::ErrorKind::TimedOut, "always fails")) })
            .await;

        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.is_exhausted());
        assert_eq!(err.attempts(), 3);
        assert_eq!(observer.attempt_starts(), 3);
        assert_eq!(observer.failures(), 2);
        assert_eq!(observer.exhaustions(), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error() {
        let observer = Arc::new(StatsObserver::new());

        let predicate =
            ClosurePredicate::new(|err: &io::Error| err.kind() != io::ErrorKind::NotFound);

        let result: Result<&str, RetryError<io::Error>> = Retrier::new(test_policy())
            .with_predicate(predicate)
            .with_observer(observer.clone())
            .execute(|| async { Err(io::Error::new(io::ErrorKind::NotFound, "not found")) })
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().is_non_retryable());
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.non_retryables(), 1);
    }

    #[tokio::test]
    async fn test_zero_max_attempts_runs_once() {
        let policy = RetryPolicy::new(0, 10);
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: Result<&str, RetryError<io::Error>> = retry(&policy, || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::other("error"))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_attempt() {
        let policy = RetryPolicy::new(1, 10);
        let observer = Arc::new(StatsObserver::new());

        let result: Result<&str, RetryError<io::Error>> = Retrier::new(policy)
            .with_observer(observer.clone())
            .execute(|| async { Err(io::Error::other("error")) })
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().is_exhausted());
        assert_eq!(observer.attempt_starts(), 1);
        assert_eq!(observer.exhaustions(), 1);
        assert_eq!(observer.failures(), 0);
    }
}
