use std::time::Duration;

use metrics::{counter, gauge, histogram};

use super::InternalEvent;

#[derive(Clone, Copy, Debug)]
pub struct SlidingWindowThrottled {
    pub consume: u64,
    pub cycles: u64,
    pub wait: Duration,
}

impl InternalEvent for SlidingWindowThrottled {
    fn emit(self) {
        // Counted even when the wait rounds down to zero.
        counter!("sliding_window_throttled_total").increment(1);
        histogram!("sliding_window_wait_seconds").record(self.wait);

        debug!(
            target: "rate_limiter_window::stats",
            consume = self.consume,
            cycles = self.cycles,
            wait_ms = self.wait.as_millis(),
            "Throttling caller until the window slides"
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SlidingWindowReleased {
    pub consume: u64,
    pub retained: usize,
    pub trimmed: usize,
}

impl InternalEvent for SlidingWindowReleased {
    fn emit(self) {
        gauge!("sliding_window_log_len").set(self.retained as f64);

        trace!(
            target: "rate_limiter_window::stats",
            consume = self.consume,
            retained = self.retained,
            trimmed = self.trimmed,
            "Window updated"
        );
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SlidingWindowNotifierFailed {
    pub reason: &'static str,
}

impl InternalEvent for SlidingWindowNotifierFailed {
    fn emit(self) {
        counter!("sliding_window_notifier_failures_total", "reason" => self.reason).increment(1);

        warn!(
            message = "Notifier failed; the throttled caller is unaffected.",
            reason = self.reason,
        );
    }
}
