//! Retry predicates
//!
//! A predicate decides whether a failed attempt should be retried. The
//! default treats every error as transient; polls that can observe a fatal
//! terminal state (a FAILED device task, for instance) use a closure
//! predicate to stop immediately.

/// Decides whether an error is worth another attempt
pub trait RetryPredicate<E: ?Sized>: Send + Sync {
    /// Return `true` to retry, `false` to stop with `RetryError::NonRetryable`
    fn should_retry(&self, error: &E) -> bool;
}

/// Predicate that retries every error
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetry;

impl<E: ?Sized> RetryPredicate<E> for AlwaysRetry {
    fn should_retry(&self, _error: &E) -> bool {
        true
    }
}

/// Predicate backed by a closure
///
/// # Example
///
/// ```rust
/// use bigip_init_core::retry::ClosurePredicate;
/// use std::io::{Error, ErrorKind};
///
/// let predicate = ClosurePredicate::new(|err: &Error| {
///     err.kind() != ErrorKind::NotFound
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ClosurePredicate<F> {
    predicate: F,
}

impl<F> ClosurePredicate<F> {
    /// Wrap a closure as a predicate
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<E, F> RetryPredicate<E> for ClosurePredicate<F>
where
    F: Fn(&E) -> bool + Send + Sync,
{
    fn should_retry(&self, error: &E) -> bool {
        (self.predicate)(error)
    }
}
