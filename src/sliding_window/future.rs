//! Future types

use std::{
    pin::Pin,
    task::{Context, Poll, ready},
};

use pin_project::pin_project;

use super::{Clock, Permit, SystemClock};

/// Future for the [`SlidingWindow`](super::SlidingWindow) service.
///
/// Holds the permit of an admitted request until the inner future resolves, so the call is
/// logged at completion time whether it succeeded or not. Dropping the future early logs the
/// call at that moment.
#[pin_project]
pub struct ResponseFuture<F, C: Clock = SystemClock> {
    permit: Option<Permit<C>>,
    #[pin]
    inner: F,
}

impl<F, C: Clock> ResponseFuture<F, C> {
    pub(super) fn new(inner: F, permit: Permit<C>) -> Self {
        Self {
            permit: Some(permit),
            inner,
        }
    }
}

impl<F, C> Future for ResponseFuture<F, C>
where
    F: Future,
    C: Clock,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let output = ready!(this.inner.poll(cx));
        if let Some(permit) = this.permit.take() {
            permit.release();
        }
        Poll::Ready(output)
    }
}
