use std::ops::ControlFlow;

use quanta::Clock;
use tracing::debug;

use crate::BucketStore;
use crate::Quota;
use crate::Reason;
use crate::Strategy;

/// A token bucket limiter keyed by client.
///
/// Every client key gets its own bucket, created full on first sight. All buckets
/// share the limiter's [`Quota`].
#[derive(Debug)]
pub struct KeyedLimiter {
    store: BucketStore,
    clock: Clock,
}

impl KeyedLimiter {
    pub fn new(quota: Quota) -> Self {
        Self::with_clock(quota, Clock::new())
    }

    pub fn with_clock(quota: Quota, clock: Clock) -> Self {
        Self {
            store: BucketStore::new(quota),
            clock,
        }
    }

    pub fn quota(&self) -> &Quota {
        self.store.quota()
    }

    pub fn store(&self) -> &BucketStore {
        &self.store
    }

    /// Decide whether a request from `key` may proceed.
    ///
    /// Refill and consume run under the same guard, so concurrent calls for one key
    /// behave as if they were issued one after another.
    pub fn admit(&self, key: &str) -> ControlFlow<Reason> {
        let now = self.clock.now();
        let quota = self.store.quota();
        self.store.with_lock(key, now, |bucket| {
            bucket.refill(quota, now);
            bucket.try_consume(quota)
        })
    }

    /// Forget clients that have been idle long enough for their bucket to refill.
    ///
    /// A bucket idle for the whole replenish interval is full, exactly like the one
    /// that would be created on the client's next request.
    pub fn evict_idle(&self) -> usize {
        let evicted = self
            .store
            .evict_idle(self.clock.now(), self.quota().replenish_interval());
        if evicted > 0 {
            debug!(evicted, remaining = self.store.len(), "evicted idle buckets");
        }
        evicted
    }
}

impl Default for KeyedLimiter {
    fn default() -> Self {
        Self::new(Quota::default())
    }
}

impl Strategy for KeyedLimiter {
    #[inline]
    fn process(&self, key: &str) -> ControlFlow<Reason> {
        self.admit(key)
    }
}
