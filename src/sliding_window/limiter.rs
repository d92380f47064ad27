use std::{
    collections::VecDeque,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use super::{
    Clock, LimiterError, Notifier, Permit, SlidingWindowSettings, SystemClock,
    error::ImmutableAttributeSnafu,
    internal_event::{InternalEvent, SlidingWindowReleased, SlidingWindowThrottled},
    validate_consume,
};

/// Sliding-window rate limiter shared by every clone of the handle.
///
/// Callers scope the protected operation between an acquisition and the release of the
/// returned [`Permit`]. An acquisition waits when the units already logged plus `consume`
/// would exceed `max_calls`; a release logs `consume` timestamps and trims entries that have
/// slid out of the window.
///
/// The wait never holds the internal lock, and a woken caller proceeds without checking the
/// window again. Admission among concurrent waiters is therefore not FIFO, and a caller that
/// raced in during someone else's wait is not accounted for by that waiter.
///
/// # Example
///
/// ```rust
/// use rate_limiter_window::sliding_window::{SlidingWindowLimiter, SlidingWindowSettings};
/// use std::time::Duration;
///
/// let limiter = SlidingWindowLimiter::new(
///     SlidingWindowSettings::builder()
///         .max_calls(2)
///         .period(Duration::from_millis(50))
///         .build(),
/// )
/// .unwrap();
///
/// let permit = limiter.acquire();
/// // ... call the rate limited API ...
/// permit.release();
///
/// assert_eq!(limiter.calls_in_window(), 1);
/// ```
pub struct SlidingWindowLimiter<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
}

struct Shared<C> {
    max_calls: u64,
    period: Duration,
    notifier: Option<Notifier>,
    clock: C,
    state: Mutex<WindowState>,
}

struct WindowState {
    /// One entry per consumed unit, oldest first.
    calls: VecDeque<Instant>,
    consume: u64,
}

impl WindowState {
    fn timespan(&self) -> Duration {
        match (self.calls.front(), self.calls.back()) {
            (Some(oldest), Some(newest)) => newest.saturating_duration_since(*oldest),
            _ => Duration::ZERO,
        }
    }
}

impl SlidingWindowLimiter {
    /// Build a limiter on the system clock.
    pub fn new(settings: SlidingWindowSettings) -> Result<Self, LimiterError> {
        Self::with_clock(settings, SystemClock)
    }
}

impl<C: Clock> SlidingWindowLimiter<C> {
    pub fn with_clock(settings: SlidingWindowSettings, clock: C) -> Result<Self, LimiterError> {
        settings.validate()?;

        let SlidingWindowSettings {
            max_calls,
            period,
            consume,
            notifier,
        } = settings;

        Ok(Self {
            shared: Arc::new(Shared {
                max_calls,
                period,
                notifier,
                clock,
                state: Mutex::new(WindowState {
                    calls: VecDeque::new(),
                    consume,
                }),
            }),
        })
    }

    /// Wait for admission, blocking the current thread.
    pub fn acquire(&self) -> Permit<C> {
        if let Some(admit_at) = self.admission() {
            let wait = admit_at.saturating_duration_since(self.shared.clock.now());
            self.shared.clock.sleep(wait);
        }
        Permit::new(self.clone())
    }

    /// Wait for admission, suspending the current task.
    ///
    /// Dropping the future before it completes leaves the window untouched.
    pub async fn acquire_async(&self) -> Permit<C> {
        if let Some(admit_at) = self.admission() {
            let wait = admit_at.saturating_duration_since(self.shared.clock.now());
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
        Permit::new(self.clone())
    }

    /// Run `f` inside an acquisition. The call is recorded even if `f` panics.
    pub fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _permit = self.acquire();
        f()
    }

    /// Await `future` inside an acquisition.
    pub async fn run_async<Fut>(&self, future: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        let _permit = self.acquire_async().await;
        future.await
    }

    /// Rate limit every invocation of `f`. Multiple arguments can be passed as a tuple.
    pub fn wrap<F, A, R>(&self, f: F) -> impl Fn(A) -> R + use<F, A, R, C>
    where
        F: Fn(A) -> R,
    {
        let limiter = self.clone();
        move |args| limiter.run(|| f(args))
    }

    pub fn max_calls(&self) -> u64 {
        self.shared.max_calls
    }

    pub fn period(&self) -> Duration {
        self.shared.period
    }

    pub fn consume(&self) -> u64 {
        self.shared.state.lock().consume
    }

    /// Change the units charged by later acquisitions. Logged entries are kept as they are.
    pub fn set_consume(&self, consume: u64) -> Result<(), LimiterError> {
        validate_consume(consume)?;
        self.shared.state.lock().consume = consume;
        Ok(())
    }

    /// `consume` always holds a value; clearing it is refused.
    pub fn remove_consume(&self) -> Result<(), LimiterError> {
        ImmutableAttributeSnafu {
            attribute: "consume",
        }
        .fail()
    }

    /// Number of logged units still inside the window.
    pub fn calls_in_window(&self) -> usize {
        self.shared.state.lock().calls.len()
    }

    /// Distance between the newest and the oldest logged unit.
    pub fn timespan(&self) -> Duration {
        self.shared.state.lock().timespan()
    }

    /// Decide whether a caller arriving now must wait, and until when.
    ///
    /// The clock is read under the lock. The notifier is dispatched after the lock is dropped.
    pub(super) fn admission(&self) -> Option<Instant> {
        let shared = &*self.shared;

        let (admit_at, throttled) = {
            let state = shared.state.lock();
            let now = shared.clock.now();
            let logged = state.calls.len() as u64;
            if logged.saturating_add(state.consume) <= shared.max_calls {
                return None;
            }

            let cycles = state.consume.div_ceil(shared.max_calls);
            let window = shared
                .period
                .saturating_mul(u32::try_from(cycles).unwrap_or(u32::MAX));
            let wait = window.saturating_sub(state.timespan());
            let admit_at = now
                .checked_add(wait)
                .unwrap_or_else(|| now + Duration::from_secs(u64::from(u32::MAX)));

            (
                admit_at,
                SlidingWindowThrottled {
                    consume: state.consume,
                    cycles,
                    wait,
                },
            )
        };

        if let Some(notifier) = &shared.notifier {
            notifier.dispatch(admit_at);
        }
        throttled.emit();

        Some(admit_at)
    }

    /// Log the finished call at the current time and slide the window forward.
    pub(super) fn record(&self) {
        let shared = &*self.shared;

        let released = {
            let mut state = shared.state.lock();
            let now = shared.clock.now();
            let consume = state.consume;
            // `validate_consume` guarantees the weight fits in `usize`.
            let units = usize::try_from(consume).unwrap_or(usize::MAX);
            state.calls.extend(std::iter::repeat_n(now, units));

            let mut trimmed = 0;
            while !state.calls.is_empty() && state.timespan() >= shared.period {
                state.calls.pop_front();
                trimmed += 1;
            }

            SlidingWindowReleased {
                consume,
                retained: state.calls.len(),
                trimmed,
            }
        };

        released.emit();
    }
}

impl<C: Clock> Clone for SlidingWindowLimiter<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: Clock> fmt::Debug for SlidingWindowLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("SlidingWindowLimiter")
            .field("max_calls", &self.shared.max_calls)
            .field("period", &self.shared.period)
            .field("consume", &state.consume)
            .field("calls_in_window", &state.calls.len())
            .field("notifier", &self.shared.notifier)
            .finish()
    }
}
