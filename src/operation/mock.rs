//! Mock operation for testing.
//!
//! This module provides a configurable operation that can be used in
//! tests to simulate a flaky dependency without a real one.

use crate::operation::Operation;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error returned by [`MockOperation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockError {
    /// Simulated failure.
    #[error("mock operation '{name}' failed")]
    Failed {
        /// Name of the mock.
        name: String,
    },

    /// The mock observed the caller's cancellation signal.
    #[error("mock operation '{name}' observed cancellation")]
    Cancelled {
        /// Name of the mock.
        name: String,
    },
}

/// A mock operation for testing purposes.
///
/// Clones share their configuration and counters, so one handle can be
/// given to the breaker while the test keeps another to flip behavior or
/// inspect call counts.
///
/// The `with_*` builders must run before the first clone. Only
/// [`set_failing`](MockOperation::set_failing) changes a shared mock.
///
/// # Examples
///
/// ```rust
/// use breakwater::operation::MockOperation;
/// use std::time::Duration;
///
/// // Always succeeds with "success"
/// let op = MockOperation::new();
///
/// // Always fails
/// let op = MockOperation::new_failing();
///
/// // Succeeds slowly
/// let op = MockOperation::new().with_latency(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct MockOperation {
    inner: Arc<MockState>,
}

#[derive(Debug)]
struct MockState {
    name: String,
    failing: AtomicBool,
    panicking: bool,
    honor_cancellation: bool,
    latency: Option<Duration>,
    calls: AtomicU64,
    completions: AtomicU64,
}

impl MockOperation {
    /// Creates a mock that succeeds.
    pub fn new() -> Self {
        Self::build(MockState {
            name: "mock".to_string(),
            failing: AtomicBool::new(false),
            panicking: false,
            honor_cancellation: false,
            latency: None,
            calls: AtomicU64::new(0),
            completions: AtomicU64::new(0),
        })
    }

    /// Creates a mock that fails.
    pub fn new_failing() -> Self {
        let op = Self::new();
        op.set_failing(true);
        op
    }

    /// Creates a mock that panics when run.
    pub fn new_panicking() -> Self {
        Self::new().map_state(|state| state.panicking = true)
    }

    /// Sets the name of this mock.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.map_state(|state| state.name = name)
    }

    /// Sets the simulated latency.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.map_state(|state| state.latency = Some(latency))
    }

    /// Makes the mock stop early when the caller's token fires.
    pub fn with_cancellation_honored(self) -> Self {
        self.map_state(|state| state.honor_cancellation = true)
    }

    /// Switches between failing and succeeding for future calls.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the name of this mock.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns how many times the mock was started.
    pub fn call_count(&self) -> u64 {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Returns how many runs finished, successfully or not.
    pub fn completed_count(&self) -> u64 {
        self.inner.completions.load(Ordering::SeqCst)
    }

    fn build(state: MockState) -> Self {
        Self {
            inner: Arc::new(state),
        }
    }

    fn map_state(self, f: impl FnOnce(&mut MockState)) -> Self {
        debug_assert!(
            Arc::strong_count(&self.inner) == 1,
            "MockOperation builders must run before cloning"
        );
        match Arc::try_unwrap(self.inner) {
            Ok(mut state) => {
                f(&mut state);
                Self::build(state)
            }
            Err(shared) => Self { inner: shared },
        }
    }

    async fn simulate(&self, cancel: &CancellationToken) -> Result<&'static str, MockError> {
        if let Some(latency) = self.inner.latency {
            if self.inner.honor_cancellation {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(MockError::Cancelled {
                            name: self.inner.name.clone(),
                        });
                    }
                    _ = tokio::time::sleep(latency) => {}
                }
            } else {
                tokio::time::sleep(latency).await;
            }
        }

        if self.inner.panicking {
            panic!("mock operation '{}' panicked", self.inner.name);
        }

        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(MockError::Failed {
                name: self.inner.name.clone(),
            });
        }
        Ok("success")
    }
}

impl Default for MockOperation {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operation for MockOperation {
    type Output = &'static str;
    type Error = MockError;

    async fn run(self, cancel: CancellationToken) -> Result<&'static str, MockError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        let result = self.simulate(&cancel).await;
        self.inner.completions.fetch_add(1, Ordering::SeqCst);
        result
    }
}
