//! Error types for the breakwater library.
//!
//! Rejections, cancellations and configuration problems are all typed.
//! The breaker never panics on caller errors; everything is returned as a
//! `Result` value.

use std::time::Duration;
use thiserror::Error;

/// The error returned by [`CircuitBreaker::execute`].
///
/// `E` is the wrapped operation's own error type. It is passed through
/// unchanged in [`BreakerError::Operation`].
///
/// [`CircuitBreaker::execute`]: crate::CircuitBreaker::execute
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The circuit is open; the operation was not attempted.
    #[error("circuit breaker '{name}' is open; retry after {retry_after:?}")]
    CircuitOpen {
        /// Name of the breaker that rejected the call.
        name: String,
        /// Time left until the breaker will admit a probe.
        retry_after: Duration,
    },

    /// The half-open probe budget is exhausted; the operation was not attempted.
    #[error("too many requests in half-open state for circuit breaker '{name}' (limit {max_requests})")]
    TooManyRequests {
        /// Name of the breaker that rejected the call.
        name: String,
        /// Configured number of concurrent probes.
        max_requests: u32,
    },

    /// The caller's cancellation signal fired before the operation resolved.
    ///
    /// The operation itself keeps running and its outcome is still recorded.
    #[error("operation was cancelled before it completed")]
    Cancelled,

    /// The operation panicked. The panic is recorded as a failure.
    #[error("operation panicked")]
    Panicked,

    /// The operation's own error.
    #[error("{0}")]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Creates a `CircuitOpen` error.
    pub fn circuit_open(name: impl Into<String>, retry_after: Duration) -> Self {
        Self::CircuitOpen {
            name: name.into(),
            retry_after,
        }
    }

    /// Creates a `TooManyRequests` error.
    pub fn too_many_requests(name: impl Into<String>, max_requests: u32) -> Self {
        Self::TooManyRequests {
            name: name.into(),
            max_requests,
        }
    }

    /// Returns `true` if the breaker failed fast without invoking the operation.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::TooManyRequests { .. })
    }

    /// Returns `true` if the caller may reasonably retry later or fall back.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CircuitOpen { .. } | Self::TooManyRequests { .. } | Self::Cancelled
        )
    }

    /// Returns `true` if the caller's wait was abandoned.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the breaker name if this is a rejection.
    pub fn breaker_name(&self) -> Option<&str> {
        match self {
            Self::CircuitOpen { name, .. } | Self::TooManyRequests { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns a reference to the operation's error, if that is what this is.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error and returns the operation's error, if any.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            _ => None,
        }
    }

    /// Maps the operation's error, leaving breaker errors untouched.
    pub fn map_operation<F, T>(self, f: F) -> BreakerError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            Self::CircuitOpen { name, retry_after } => BreakerError::CircuitOpen { name, retry_after },
            Self::TooManyRequests { name, max_requests } => {
                BreakerError::TooManyRequests { name, max_requests }
            }
            Self::Cancelled => BreakerError::Cancelled,
            Self::Panicked => BreakerError::Panicked,
            Self::Operation(e) => BreakerError::Operation(f(e)),
        }
    }
}

/// Error type for rejected breaker configurations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration field holds an unusable value.
    #[error("invalid configuration for '{field}': {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an `Invalid` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Returns the name of the rejected field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Invalid { field, .. } => field,
        }
    }
}

/// A specialized `Result` type for breaker executions.
pub type BreakerResult<T, E> = Result<T, BreakerError<E>>;

/// A specialized `Result` type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_are_recoverable() {
        let open: BreakerError<std::io::Error> =
            BreakerError::circuit_open("payments", Duration::from_secs(5));
        assert!(open.is_rejected());
        assert!(open.is_recoverable());
        assert_eq!(open.breaker_name(), Some("payments"));

        let busy: BreakerError<std::io::Error> = BreakerError::too_many_requests("payments", 1);
        assert!(busy.is_rejected());

        let cancelled: BreakerError<std::io::Error> = BreakerError::Cancelled;
        assert!(!cancelled.is_rejected());
        assert!(cancelled.is_recoverable());
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_operation_error_passes_through() {
        let err = BreakerError::Operation(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(!err.is_rejected());
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "refused");

        let inner = err.into_operation_error().unwrap();
        assert_eq!(inner.kind(), std::io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn test_map_operation() {
        let err: BreakerError<u32> = BreakerError::Operation(7);
        let mapped = err.map_operation(|code| format!("code {code}"));
        assert_eq!(mapped.operation_error().map(String::as_str), Some("code 7"));

        let open: BreakerError<u32> = BreakerError::circuit_open("db", Duration::ZERO);
        assert!(open.map_operation(|c| c.to_string()).is_rejected());
    }

    #[test]
    fn test_error_display() {
        let err: BreakerError<String> = BreakerError::too_many_requests("search", 3);
        assert!(err.to_string().contains("search"));
        assert!(err.to_string().contains("limit 3"));

        let cfg = ConfigError::invalid("max_half_open_requests", "must be at least 1");
        assert_eq!(cfg.field(), "max_half_open_requests");
        assert!(cfg.to_string().contains("must be at least 1"));
    }
}
