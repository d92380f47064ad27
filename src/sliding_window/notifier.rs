use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    time::Instant,
};

use super::internal_event::{InternalEvent, SlidingWindowNotifierFailed};

type Callback = dyn Fn(Instant) + Send + Sync + 'static;

/// Callback told when a throttled caller will be admitted.
///
/// The callback runs detached from the caller: inside a tokio runtime it is handed to
/// `spawn_blocking`, otherwise to a short-lived named thread. A panic inside it is caught and
/// logged; it never reaches the throttled caller.
#[derive(Clone)]
pub struct Notifier {
    callback: Arc<Callback>,
}

impl Notifier {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Instant) + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Fire and forget. Must be called without holding the limiter's lock.
    pub(super) fn dispatch(&self, admit_at: Instant) {
        let callback = Arc::clone(&self.callback);
        let job = move || {
            if catch_unwind(AssertUnwindSafe(|| callback(admit_at))).is_err() {
                SlidingWindowNotifierFailed {
                    reason: "callback panicked",
                }
                .emit();
            }
        };

        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            drop(handle.spawn_blocking(job));
            return;
        }

        if let Err(error) = std::thread::Builder::new()
            .name("sliding-window-notifier".into())
            .spawn(job)
        {
            warn!(message = "Failed to spawn notifier thread.", %error);
            SlidingWindowNotifierFailed {
                reason: "spawn failed",
            }
            .emit();
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}
