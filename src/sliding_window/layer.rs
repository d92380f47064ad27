use std::fmt;

use tower::Layer;

use super::{Clock, SlidingWindow, SlidingWindowLimiter, SystemClock};

/// Enforces a sliding-window rate limit on the underlying service.
///
/// Every service produced by one layer shares the layer's limiter, so a single quota can
/// cover several clients.
///
/// # Example
///
/// ```rust
/// use rate_limiter_window::sliding_window::{
///     SlidingWindowLayer, SlidingWindowLimiter, SlidingWindowSettings,
/// };
/// use tower::{ServiceBuilder, service_fn};
///
/// let limiter = SlidingWindowLimiter::new(
///     SlidingWindowSettings::builder().max_calls(100).build(),
/// )
/// .unwrap();
///
/// let service = ServiceBuilder::new()
///     .layer(SlidingWindowLayer::new(limiter))
///     .service(service_fn(|name: String| async move {
///         Ok::<_, std::convert::Infallible>(format!("hello {name}"))
///     }));
/// # drop(service);
/// ```
pub struct SlidingWindowLayer<C: Clock = SystemClock> {
    limiter: SlidingWindowLimiter<C>,
}

impl<C: Clock> SlidingWindowLayer<C> {
    pub fn new(limiter: SlidingWindowLimiter<C>) -> Self {
        SlidingWindowLayer { limiter }
    }
}

impl<S, C: Clock> Layer<S> for SlidingWindowLayer<C> {
    type Service = SlidingWindow<S, C>;

    fn layer(&self, service: S) -> Self::Service {
        SlidingWindow::new(service, self.limiter.clone())
    }
}

impl<C: Clock> Clone for SlidingWindowLayer<C> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
        }
    }
}

impl<C: Clock> fmt::Debug for SlidingWindowLayer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlidingWindowLayer")
            .field("limiter", &self.limiter)
            .finish()
    }
}
