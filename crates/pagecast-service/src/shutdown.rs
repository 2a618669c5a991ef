use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use http::{Request, Response, StatusCode};
use http_body::Body;
use pin_project::pin_project;
use tokio::sync::Notify;
use tower::{Layer, Service};

#[derive(Default)]
struct Inner {
    draining: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Shared drain status: whether shutdown started and how many requests are still running
#[derive(Clone, Default)]
pub struct ShutdownState {
    inner: Arc<Inner>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop admitting requests. Running ones are left to finish.
    pub fn start_shutdown(&self) {
        self.inner.draining.store(true, Ordering::SeqCst);
        if self.in_flight_count() == 0 {
            self.inner.idle.notify_waiters();
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.draining.load(Ordering::SeqCst)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Resolves once shutdown has started and no request is in flight.
    pub fn completed(&self) -> impl Future<Output = ()> + Send + 'static {
        let inner = self.inner.clone();
        async move {
            loop {
                let notified = inner.idle.notified();
                tokio::pin!(notified);
                // register before checking so a wake-up between check and await is not lost
                notified.as_mut().enable();

                if inner.draining.load(Ordering::SeqCst)
                    && inner.in_flight.load(Ordering::SeqCst) == 0
                {
                    return;
                }
                notified.await;
            }
        }
    }

    fn enter(&self) -> InFlight {
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight {
            inner: self.inner.clone(),
        }
    }
}

/// Counts one admitted request until dropped, whether it completed or was cancelled.
struct InFlight {
    inner: Arc<Inner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let remaining = self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && self.inner.draining.load(Ordering::SeqCst) {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Tower layer that answers 503 once shutdown started and tracks in-flight requests
#[derive(Clone)]
pub struct GracefulShutdownLayer {
    state: ShutdownState,
}

impl GracefulShutdownLayer {
    pub fn new(state: ShutdownState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for GracefulShutdownLayer {
    type Service = GracefulShutdownService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GracefulShutdownService {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct GracefulShutdownService<S> {
    inner: S,
    state: ShutdownState,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for GracefulShutdownService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: Body + Default,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = GracefulShutdownFuture<S::Future, ResBody, S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if self.state.is_shutting_down() {
            let mut response = Response::new(ResBody::default());
            *response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;

            return GracefulShutdownFuture {
                kind: FutureKind::Rejected(Some(Ok(response))),
            };
        }

        let guard = self.state.enter();
        GracefulShutdownFuture {
            kind: FutureKind::Admitted {
                future: self.inner.call(req),
                _guard: guard,
            },
        }
    }
}

#[pin_project]
pub struct GracefulShutdownFuture<F, B, E> {
    #[pin]
    kind: FutureKind<F, B, E>,
}

#[pin_project(project = FutureKindProj)]
enum FutureKind<F, B, E> {
    Admitted {
        #[pin]
        future: F,
        _guard: InFlight,
    },
    Rejected(Option<Result<Response<B>, E>>),
}

impl<F, B, E> Future for GracefulShutdownFuture<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
    B: Body,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().kind.project() {
            FutureKindProj::Admitted { future, .. } => future.poll(cx),
            FutureKindProj::Rejected(response) => {
                Poll::Ready(response.take().expect("polled after completion"))
            }
        }
    }
}
