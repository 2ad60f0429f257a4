//! Trailing-edge coalescing of high-frequency changes.
//!
//! A [`Throttle`] sits between pointer-rate events (camera drags, slider
//! moves) and slower consumers such as persistence. It runs on an explicit
//! clock supplied by the caller, so it behaves the same under a render loop,
//! a timer, or a test.

use std::time::Duration;

/// Coalesces bursts of values and delivers the last one after a quiet period.
///
/// The final value of a burst is never dropped unless the throttle is
/// explicitly cancelled. With a `max_wait`, a continuous burst still delivers
/// its latest value at least that often.
#[derive(Debug, Clone)]
pub struct Throttle<T> {
    quiet: Duration,
    max_wait: Option<Duration>,
    pending: Option<T>,
    first_push: Duration,
    last_push: Duration,
}

impl<T> Throttle<T> {
    /// Creates a throttle with the given quiet period.
    #[must_use]
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            max_wait: None,
            pending: None,
            first_push: Duration::ZERO,
            last_push: Duration::ZERO,
        }
    }

    /// Also deliver during an unbroken burst once `max_wait` has elapsed.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    /// The quiet period.
    #[must_use]
    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    /// Records a new value at time `now`, replacing any undelivered one.
    pub fn push(&mut self, value: T, now: Duration) {
        if self.pending.is_none() {
            self.first_push = now;
        }
        self.pending = Some(value);
        self.last_push = now;
    }

    /// Returns whether a value is waiting to be delivered.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Delivers the pending value if it is due at time `now`.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        self.pending.as_ref()?;
        let quiet_elapsed = now.saturating_sub(self.last_push) >= self.quiet;
        let waited_too_long = self
            .max_wait
            .is_some_and(|max| now.saturating_sub(self.first_push) >= max);
        if quiet_elapsed || waited_too_long {
            self.pending.take()
        } else {
            None
        }
    }

    /// Delivers the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Drops the pending value. Returns whether one was dropped.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
