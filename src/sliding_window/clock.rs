use std::time::{Duration, Instant};

/// Time source and blocking wait primitive used by the limiter.
///
/// The async binding does not go through [`Clock::sleep`]; it always suspends on
/// `tokio::time::sleep` for the distance between [`Clock::now`] and the admission instant.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Block the current thread. Zero durations return immediately.
    fn sleep(&self, duration: Duration);
}

/// Wall-clock time from `std`, blocking with `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Reads `tokio::time::Instant`, so a paused runtime clock is honoured.
///
/// Meant for [`SlidingWindowLimiter::acquire_async`](super::SlidingWindowLimiter::acquire_async)
/// and the tower layer, which wait on `tokio::time::sleep` and therefore stay on the same
/// clock as [`Clock::now`]. The blocking [`Clock::sleep`] cannot suspend on the runtime's
/// timer and parks the thread in real time; a paused or advanced runtime clock does not
/// shorten it. Use [`SystemClock`] with the blocking binding.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::time;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_the_paused_runtime() {
        let before = TokioClock.now();
        let system_before = SystemClock.now();

        time::advance(Duration::from_secs(30)).await;

        assert_eq!(TokioClock.now() - before, Duration::from_secs(30));
        assert!(SystemClock.now() - system_before < Duration::from_secs(30));
    }

    #[test]
    fn blocking_sleep_waits_in_real_time() {
        for clock in [&TokioClock as &dyn Clock, &SystemClock] {
            let start = Instant::now();
            clock.sleep(Duration::from_millis(20));
            assert!(start.elapsed() >= Duration::from_millis(20));

            let start = Instant::now();
            clock.sleep(Duration::ZERO);
            assert!(start.elapsed() < Duration::from_millis(20));
        }
    }
}
