use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use quanta::Instant;
use tracing::trace;

use crate::Quota;
use crate::TokenBucket;

/// Owns every client bucket of a limiter.
///
/// Buckets live in a sharded map. Holding the guard returned by
/// [`get_or_create`](BucketStore::get_or_create) locks the shard of that key, so no
/// other caller can observe or modify the bucket until the guard is dropped.
#[derive(Debug)]
pub struct BucketStore {
    buckets: DashMap<String, TokenBucket>,
    quota: Quota,
}

impl BucketStore {
    pub fn new(quota: Quota) -> Self {
        Self {
            buckets: DashMap::new(),
            quota,
        }
    }

    pub fn quota(&self) -> &Quota {
        &self.quota
    }

    /// Lock the bucket for `key`, creating a full one if the key is new.
    ///
    /// Creation happens under the shard guard, so concurrent first requests for the
    /// same key share a single bucket.
    pub fn get_or_create(&self, key: &str, now: Instant) -> RefMut<'_, String, TokenBucket> {
        if let Some(bucket) = self.buckets.get_mut(key) {
            return bucket;
        }
        self.buckets.entry(key.to_owned()).or_insert_with(|| {
            trace!(key, "creating bucket");
            TokenBucket::full(&self.quota, now)
        })
    }

    /// Run `f` with exclusive access to the bucket for `key`.
    ///
    /// The guard is released when this returns, including when `f` unwinds.
    pub fn with_lock<F, R>(&self, key: &str, now: Instant, f: F) -> R
    where
        F: FnOnce(&mut TokenBucket) -> R,
    {
        let mut bucket = self.get_or_create(key, now);
        f(bucket.value_mut())
    }

    /// Current token count for `key`, without refilling.
    pub fn tokens(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.tokens())
    }

    /// Drop every bucket last refreshed at least `idle` before `now`.
    ///
    /// Returns the number of buckets removed.
    pub fn evict_idle(&self, now: Instant, idle: Duration) -> usize {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refreshed()) < idle);
        before.saturating_sub(self.buckets.len())
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
