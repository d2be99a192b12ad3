//! Error types for the retry engine

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors produced by retry execution
///
/// Generic over `E`, the underlying error type of the retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The attempt ceiling was reached and the operation still failed
    Exhausted {
        /// Attempts made, first attempt included
        attempts: u32,
        /// The error from the final attempt
        source: E,
        /// Wall-clock time spent across all attempts
        total_duration: Duration,
    },

    /// A predicate classified the error as not worth retrying
    NonRetryable(E),
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                attempts,
                source,
                total_duration,
            } => {
                write!(
                    f,
                    "retry exhausted after {} attempts over {:.2}s: {}",
                    attempts,
                    total_duration.as_secs_f64(),
                    source
                )
            }
            RetryError::NonRetryable(source) => {
                write!(f, "non-retryable error: {}", source)
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::NonRetryable(source) => Some(source),
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new exhausted error
    pub fn exhausted(attempts: u32, source: E, total_duration: Duration) -> Self {
        RetryError::Exhausted {
            attempts,
            source,
            total_duration,
        }
    }

    /// Create a new non-retryable error
    pub fn non_retryable(source: E) -> Self {
        RetryError::NonRetryable(source)
    }

    /// Number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::NonRetryable(_) => 1,
        }
    }

    /// Whether the attempt ceiling was reached
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Whether a predicate stopped the retries
    pub fn is_non_retryable(&self) -> bool {
        matches!(self, RetryError::NonRetryable(_))
    }

    /// The underlying error, consuming this error
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::NonRetryable(source) => source,
        }
    }

    /// A reference to the underlying error
    pub fn source_ref(&self) -> &E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::NonRetryable(source) => source,
        }
    }
}
