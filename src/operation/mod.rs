//! The unit of work a circuit breaker protects.
//!
//! Anything that implements [`Operation`] can be run through
//! [`CircuitBreaker::execute`](crate::CircuitBreaker::execute). Closures
//! taking a [`CancellationToken`] and returning a future of `Result<T, E>`
//! already do:
//!
//! ```rust
//! use breakwater::CircuitBreaker;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let breaker = CircuitBreaker::with_defaults();
//! let token = CancellationToken::new();
//!
//! let answer = breaker
//!     .execute(&token, |_cancel: CancellationToken| async { Ok::<_, std::io::Error>(42) })
//!     .await;
//! assert_eq!(answer.unwrap(), 42);
//! # }
//! ```
//!
//! ## Available helpers
//!
//! - [`mock`] - A configurable operation for tests and demos

pub mod mock;

pub use mock::{MockError, MockOperation};

use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// A single invocation of an unreliable dependency.
///
/// # Implementation Notes
///
/// - The operation is moved into its own task, so it must be `Send + 'static`.
/// - It may outlive the caller's wait; the breaker still collects its outcome.
/// - The token is the caller's cancellation signal. Observing it is optional;
///   the breaker never aborts the operation itself.
#[async_trait]
pub trait Operation: Send + 'static {
    /// The value produced on success.
    type Output: Send + 'static;

    /// The error produced on failure. Any error counts as a failure.
    type Error: Send + 'static;

    /// Runs the operation once.
    async fn run(self, cancel: CancellationToken) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<F, Fut, T, E> Operation for F
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn run(self, cancel: CancellationToken) -> Result<T, E> {
        (self)(cancel).await
    }
}
