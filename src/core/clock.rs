//! Time sources for recovery timing.
//!
//! The breaker measures how long it has been open through a [`Clock`] so
//! tests can drive recovery without real sleeps.

use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Returns the current wall-clock time, used for `last_failure_time`.
    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The default clock.
///
/// Reads tokio's clock, so a paused test runtime controls it as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the breaker.
///
/// ```rust
/// use breakwater::core::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(clock.now() - start, Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    inner: Arc<Mutex<ManualTime>>,
}

#[derive(Debug)]
struct ManualTime {
    origin: Instant,
    wall_origin: DateTime<Utc>,
    offset: Duration,
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualTime {
                origin: Instant::now(),
                wall_origin: Utc::now(),
                offset: Duration::ZERO,
            })),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut time = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        time.offset += by;
    }

    /// Returns how far the clock has been advanced in total.
    pub fn elapsed(&self) -> Duration {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .offset
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let time = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        time.origin + time.offset
    }

    fn wall_time(&self) -> DateTime<Utc> {
        let time = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        chrono::Duration::from_std(time.offset)
            .ok()
            .and_then(|offset| time.wall_origin.checked_add_signed(offset))
            .unwrap_or(time.wall_origin)
    }
}
