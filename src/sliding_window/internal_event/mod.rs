//! Internal events emitted by the limiter. Each event records its metrics and logs itself.

mod sliding_window;

pub use sliding_window::{
    SlidingWindowNotifierFailed, SlidingWindowReleased, SlidingWindowThrottled,
};

pub trait InternalEvent: Sized {
    fn emit(self);
}
