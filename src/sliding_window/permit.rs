use std::fmt;

use super::{Clock, SlidingWindowLimiter, SystemClock};

/// An admitted slot in the window.
///
/// Releasing the permit, explicitly or by dropping it, logs `consume` timestamps at the
/// moment of release and trims the window. This happens on every exit path, panics included.
#[must_use = "dropping a permit records the call immediately"]
pub struct Permit<C: Clock = SystemClock> {
    limiter: Option<SlidingWindowLimiter<C>>,
}

impl<C: Clock> Permit<C> {
    pub(super) fn new(limiter: SlidingWindowLimiter<C>) -> Self {
        Self {
            limiter: Some(limiter),
        }
    }

    /// Record the call now instead of at the end of the scope.
    pub fn release(mut self) {
        self.record();
    }

    /// Give the slot back without logging anything, as if the acquisition never happened.
    pub(super) fn forfeit(mut self) {
        self.limiter = None;
    }

    fn record(&mut self) {
        if let Some(limiter) = self.limiter.take() {
            limiter.record();
        }
    }
}

impl<C: Clock> Drop for Permit<C> {
    fn drop(&mut self) {
        self.record();
    }
}

impl<C: Clock> fmt::Debug for Permit<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Permit")
            .field("released", &self.limiter.is_none())
            .finish()
    }
}
