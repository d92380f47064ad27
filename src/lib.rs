//! Sliding-window rate limiter for weighted operations
//!
//! This crate caps how many weighted operations may run inside any trailing window of
//! length `period`, delaying callers that would exceed the cap instead of rejecting them.
//! It is meant to sit in front of an external quota ("100 calls per minute") inside API
//! clients, schedulers and worker pools.
//!
//! # Algorithm Overview
//!
//! The limiter keeps a log of timestamps, one per consumed unit:
//! 1. **Admission**: if `logged + consume > max_calls`, the caller waits until
//!    `now + ceil(consume / max_calls) * period - (newest - oldest)`
//! 2. **Release**: `consume` copies of the release time are appended and entries older than
//!    one `period` relative to the newest are trimmed from the front
//!
//! # Bindings
//! - Blocking: [`SlidingWindowLimiter::acquire`] parks the calling thread
//! - Async: [`SlidingWindowLimiter::acquire_async`] suspends the tokio task
//! - Tower: [`sliding_window::SlidingWindowLayer`] wraps any `tower::Service`
//!
//! # Safety & Concurrency
//! - Thread-safe: all log reads and writes happen under one mutex, never held across a wait
//! - No FIFO fairness among waiting callers
//! - No unsafe code
//!
//! # Basic Usage
//! ```
//! use rate_limiter_window::sliding_window::{SlidingWindowLimiter, SlidingWindowSettings};
//! use std::time::Duration;
//!
//! let settings = SlidingWindowSettings::builder()
//!     .max_calls(100)
//!     .period(Duration::from_secs(60))
//!     .build();
//! let limiter = SlidingWindowLimiter::new(settings).unwrap();
//!
//! let answer = limiter.run(|| 6 * 7);
//! assert_eq!(answer, 42);
//! assert_eq!(limiter.calls_in_window(), 1);
//! ```
//!
//! # Metrics
//! Emits metrics via the `InternalEvent` trait
pub mod sliding_window;
#[cfg(test)]
pub mod test_utils;

pub use sliding_window::SlidingWindowLimiter;

#[macro_use]
extern crate tracing;
