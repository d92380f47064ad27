use std::{
    fmt,
    task::{Context, Poll, ready},
};

use futures::future::BoxFuture;
use tower::Service;

use super::{Clock, Permit, ResponseFuture, SlidingWindowLimiter, SystemClock};

/// Delays requests so the inner service sees at most `max_calls` weighted calls per window.
///
/// Admission is decided in `poll_ready`: the service stays pending until the window has room
/// and only then asks the inner service for readiness. `call` hands the request to the inner
/// service with the permit obtained there, so nothing reaches the inner service before
/// admission. The permit is released when the response future resolves.
///
/// A permit obtained by `poll_ready` but never used by `call` is given back without being
/// logged when the service is dropped.
///
/// # Panics
///
/// `call` panics unless the preceding `poll_ready` returned `Ready(Ok(()))`.
pub struct SlidingWindow<S, C: Clock = SystemClock> {
    inner: S,
    limiter: SlidingWindowLimiter<C>,
    state: State<C>,
}

enum State<C: Clock> {
    Idle,
    Waiting(BoxFuture<'static, Permit<C>>),
    Admitted(Reserved<C>),
}

/// Admission that has not been used by a call yet.
struct Reserved<C: Clock>(Option<Permit<C>>);

impl<C: Clock> Reserved<C> {
    fn take(mut self) -> Option<Permit<C>> {
        self.0.take()
    }
}

impl<C: Clock> Drop for Reserved<C> {
    fn drop(&mut self) {
        if let Some(permit) = self.0.take() {
            permit.forfeit();
        }
    }
}

impl<S, C: Clock> SlidingWindow<S, C> {
    pub fn new(inner: S, limiter: SlidingWindowLimiter<C>) -> Self {
        Self {
            inner,
            limiter,
            state: State::Idle,
        }
    }

    pub fn limiter(&self) -> &SlidingWindowLimiter<C> {
        &self.limiter
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, C, Request> Service<Request> for SlidingWindow<S, C>
where
    S: Service<Request>,
    C: Clock,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, C>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        loop {
            match &mut self.state {
                State::Idle => {
                    let limiter = self.limiter.clone();
                    self.state =
                        State::Waiting(Box::pin(async move { limiter.acquire_async().await }));
                }
                State::Waiting(admission) => {
                    let permit = ready!(admission.as_mut().poll(cx));
                    self.state = State::Admitted(Reserved(Some(permit)));
                }
                State::Admitted(_) => return self.inner.poll_ready(cx),
            }
        }
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let permit = match std::mem::replace(&mut self.state, State::Idle) {
            State::Admitted(reserved) => reserved.take(),
            _ => None,
        };
        match permit {
            Some(permit) => ResponseFuture::new(self.inner.call(request), permit),
            None => panic!("SlidingWindow::call invoked before poll_ready returned Ready"),
        }
    }
}

impl<S: Clone, C: Clock> Clone for SlidingWindow<S, C> {
    /// The clone starts without an admission of its own.
    fn clone(&self) -> Self {
        Self::new(self.inner.clone(), self.limiter.clone())
    }
}

impl<S: fmt::Debug, C: Clock> fmt::Debug for SlidingWindow<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Idle => "idle",
            State::Waiting(_) => "waiting",
            State::Admitted(_) => "admitted",
        };
        f.debug_struct("SlidingWindow")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        convert::Infallible,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use tokio::time;
    use tokio_test::{assert_pending, assert_ready_err, assert_ready_ok, task};
    use tower::{Layer, ServiceExt, service_fn};
    use tower_test::{assert_request_eq, mock};

    use super::*;
    use crate::sliding_window::{SlidingWindowLayer, SlidingWindowSettings, TokioClock};

    fn limiter(max_calls: u64) -> SlidingWindowLimiter<TokioClock> {
        let settings = SlidingWindowSettings::builder()
            .max_calls(max_calls)
            .period(Duration::from_secs(1))
            .build();
        SlidingWindowLimiter::with_clock(settings, TokioClock).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn delays_calls_beyond_capacity() {
        let limiter = limiter(1);
        let (mut service, mut handle) = mock::spawn_layer::<&'static str, &'static str, _>(
            SlidingWindowLayer::new(limiter.clone()),
        );

        assert_ready_ok!(service.poll_ready());
        let mut first = task::spawn(service.call("first"));
        assert_pending!(first.poll());
        assert_eq!(limiter.calls_in_window(), 0);

        assert_request_eq!(handle, "first").send_response("one");
        assert_eq!(assert_ready_ok!(first.poll()), "one");
        assert_eq!(limiter.calls_in_window(), 1);

        assert_pending!(service.poll_ready());
        assert_pending!(handle.poll_request());

        time::advance(Duration::from_millis(500)).await;
        assert_pending!(service.poll_ready());
        assert_pending!(handle.poll_request());

        time::advance(Duration::from_millis(500)).await;
        assert_ready_ok!(service.poll_ready());
        let mut second = task::spawn(service.call("second"));
        assert_request_eq!(handle, "second").send_response("two");
        assert_eq!(assert_ready_ok!(second.poll()), "two");
        assert_eq!(limiter.calls_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn inner_service_is_not_called_before_admission() {
        let limiter = limiter(1);
        let started = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&started);
        let mut service = SlidingWindowLayer::new(limiter.clone()).layer(service_fn(move |n: u32| {
            // Work done eagerly in `call`, before the returned future is polled.
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, Infallible>(n) }
        }));

        assert_eq!(service.ready().await.unwrap().call(1).await.unwrap(), 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);

        let mut second = task::spawn(async {
            let ready = service.ready().await.unwrap();
            ready.call(2).await
        });
        assert_pending!(second.poll());
        assert_eq!(started.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(999)).await;
        assert_pending!(second.poll());
        assert_eq!(started.load(Ordering::SeqCst), 1);

        time::advance(Duration::from_millis(1)).await;
        assert_eq!(assert_ready_ok!(second.poll()), 2);
        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(limiter.calls_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_pass_through_and_are_recorded() {
        let limiter = limiter(5);
        let (mut service, mut handle) = mock::spawn_layer::<&'static str, &'static str, _>(
            SlidingWindowLayer::new(limiter.clone()),
        );

        assert_ready_ok!(service.poll_ready());
        let mut fut = task::spawn(service.call("boom"));
        assert_request_eq!(handle, "boom")
            .send_error(std::io::Error::other("upstream failed"));

        let err = assert_ready_err!(fut.poll());
        assert_eq!(err.to_string(), "upstream failed");
        assert_eq!(limiter.calls_in_window(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_while_waiting_records_nothing() {
        let limiter = limiter(1);
        limiter.run_async(async {}).await;

        let (mut service, _handle) = mock::spawn_layer::<&'static str, &'static str, _>(
            SlidingWindowLayer::new(limiter.clone()),
        );

        assert_pending!(service.poll_ready());
        drop(service);

        time::advance(Duration::from_secs(5)).await;
        assert_eq!(limiter.calls_in_window(), 1);
        assert_eq!(limiter.timespan(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn unused_admission_is_given_back() {
        let limiter = limiter(1);
        let (mut service, _handle) = mock::spawn_layer::<&'static str, &'static str, _>(
            SlidingWindowLayer::new(limiter.clone()),
        );

        assert_ready_ok!(service.poll_ready());
        drop(service);
        assert_eq!(limiter.calls_in_window(), 0);
    }

    #[tokio::test(start_paused = true)]
    #[should_panic(expected = "before poll_ready")]
    async fn call_without_readiness_panics() {
        let (mut service, _handle) = mock::spawn_layer::<&'static str, &'static str, _>(
            SlidingWindowLayer::new(limiter(1)),
        );

        let _ = service.call("too early");
    }
}
