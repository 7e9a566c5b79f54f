use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use http::Request;
use http::Response;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::Service;
use tracing::debug;
use tracing::warn;

use bucket_limit::Reason;
use bucket_limit::Strategy;

use crate::error::LimitError;
use crate::key::KeyExtractor;
use crate::key::UNKNOWN_CLIENT;

#[derive(Clone, Debug)]
struct RateLimitServiceMetrics {
    admitted: Counter<u64>,
    rejected: Counter<u64>,
}

/// Admits or rejects each request according to its client's bucket.
///
/// Admitted requests are handed to the inner service untouched. Rejected requests
/// never reach it; they are answered with `429 Too Many Requests`.
#[derive(Debug)]
pub struct RateLimitService<L, K, S>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    extractor: K,
    retry_after: bool,
    instruments: RateLimitServiceMetrics,
}

pin_project! {
    /// Either the inner service's future or an already rendered rejection.
    pub struct ResponseFuture<F, B> {
        #[pin]
        state: State<F, B>,
    }
}

pin_project! {
    #[project = StateProj]
    enum State<F, B> {
        Inner {
            #[pin]
            fut: F,
        },
        Limited {
            response: Option<Response<B>>,
        },
    }
}

impl<F, B, E> Future for ResponseFuture<F, B>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<B>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            StateProj::Inner { fut } => fut.poll(cx),
            StateProj::Limited { response } => Poll::Ready(Ok(response
                .take()
                .expect("ResponseFuture polled after completion"))),
        }
    }
}

impl<L, K, S> Clone for RateLimitService<L, K, S>
where
    L: ?Sized,
    K: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            extractor: self.extractor.clone(),
            retry_after: self.retry_after,
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, K, S, ReqBody, ResBody> Service<Request<ReqBody>> for RateLimitService<L, K, S>
where
    L: Strategy + ?Sized,
    K: KeyExtractor,
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    ResBody: From<&'static str>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future, ResBody>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let key = self.extractor.extract(&req).unwrap_or_else(|| {
            debug!("no client key for request, using {UNKNOWN_CLIENT}");
            UNKNOWN_CLIENT.to_owned()
        });

        let state = match self.limiter.process(&key) {
            ControlFlow::Continue(()) => {
                self.instruments.admitted.add(1, &[]);
                State::Inner {
                    fut: self.inner.call(req),
                }
            }
            ControlFlow::Break(Reason::Overloaded { retry_after }) => {
                self.instruments.rejected.add(1, &[]);
                warn!(key = %key, ?retry_after, "rate limit exceeded");
                let response =
                    LimitError::RateLimited { retry_after }.into_http_response(self.retry_after);
                State::Limited {
                    response: Some(response),
                }
            }
        };

        ResponseFuture { state }
    }
}

impl<L, K, S> RateLimitService<L, K, S>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>, extractor: K) -> Self {
        let meter = global::meter("rate_limit_service");
        let instruments = RateLimitServiceMetrics {
            admitted: meter.u64_counter("requests_admitted").build(),
            rejected: meter.u64_counter("requests_rejected").build(),
        };

        Self {
            inner,
            limiter,
            extractor,
            retry_after: false,
            instruments,
        }
    }

    pub fn with_retry_after(mut self, retry_after: bool) -> Self {
        self.retry_after = retry_after;
        self
    }
}
