use std::sync::Arc;

use bucket_limit::Strategy;
use tower::ServiceBuilder;
use tower::layer::util::Stack;

use crate::ForwardedFor;
use crate::RateLimitLayer;

/// Service Builder Extension adding per-client rate limiting to tower::ServiceBuilder.
pub trait ServiceBuilderExt<L> {
    /// Limit requests per connected peer IP address.
    fn rate_limit_by_peer<S>(self, limiter: Arc<S>) -> ServiceBuilder<Stack<RateLimitLayer<S>, L>>
    where
        S: Strategy + ?Sized;

    /// Limit requests per `X-Forwarded-For` client address.
    ///
    /// Only sound behind a proxy that sets the header itself.
    fn rate_limit_by_forwarded_for<S>(
        self,
        limiter: Arc<S>,
    ) -> ServiceBuilder<Stack<RateLimitLayer<S, ForwardedFor>, L>>
    where
        S: Strategy + ?Sized;
}

impl<L> ServiceBuilderExt<L> for ServiceBuilder<L> {
    fn rate_limit_by_peer<S>(self, limiter: Arc<S>) -> ServiceBuilder<Stack<RateLimitLayer<S>, L>>
    where
        S: Strategy + ?Sized,
    {
        self.layer(RateLimitLayer::new(limiter))
    }

    fn rate_limit_by_forwarded_for<S>(
        self,
        limiter: Arc<S>,
    ) -> ServiceBuilder<Stack<RateLimitLayer<S, ForwardedFor>, L>>
    where
        S: Strategy + ?Sized,
    {
        self.layer(RateLimitLayer::new(limiter).with_extractor(ForwardedFor))
    }
}
