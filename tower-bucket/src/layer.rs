use std::sync::Arc;

use bucket_limit::KeyedLimiter;
use bucket_limit::Quota;
use bucket_limit::Strategy;
use tower::Layer;

use crate::key::KeyExtractor;
use crate::key::PeerIp;
use crate::service::RateLimitService;

/// Applies per-client Rate Limit to requests.
#[derive(Debug)]
pub struct RateLimitLayer<L, K = PeerIp>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    extractor: K,
    retry_after: bool,
}

impl<L, K> Clone for RateLimitLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            extractor: self.extractor.clone(),
            retry_after: self.retry_after,
        }
    }
}

impl RateLimitLayer<KeyedLimiter> {
    /// Create a RateLimitLayer backed by a fresh [`KeyedLimiter`] for `quota`.
    pub fn from_quota(quota: Quota) -> Self {
        Self::new(Arc::new(KeyedLimiter::new(quota)))
    }
}

impl<L> RateLimitLayer<L>
where
    L: Strategy + ?Sized,
{
    /// Create a RateLimitLayer keyed by peer IP address.
    pub fn new(limiter: Arc<L>) -> Self {
        RateLimitLayer {
            limiter,
            extractor: PeerIp,
            retry_after: false,
        }
    }
}

impl<L, K> RateLimitLayer<L, K>
where
    L: Strategy + ?Sized,
    K: KeyExtractor,
{
    /// Use `extractor` to derive the client key of each request.
    pub fn with_extractor<K2: KeyExtractor>(self, extractor: K2) -> RateLimitLayer<L, K2> {
        RateLimitLayer {
            limiter: self.limiter,
            extractor,
            retry_after: self.retry_after,
        }
    }

    /// Set whether rejections carry a `Retry-After` header.
    pub fn with_retry_after(mut self, retry_after: bool) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }
}

impl<L, K, S> Layer<S> for RateLimitLayer<L, K>
where
    L: ?Sized,
    K: Clone,
{
    type Service = RateLimitService<L, K, S>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService::new(service, self.limiter.clone(), self.extractor.clone())
            .with_retry_after(self.retry_after)
    }
}
