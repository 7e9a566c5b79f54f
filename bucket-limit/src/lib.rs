//! # bucket-limit
//!
//! `bucket-limit` provides per-client token bucket rate limiting.
//!
//! ## Core Philosophy
//!
//! Every client key owns a bucket of up to `capacity` tokens that refills at a fixed
//! rate. A request is admitted when a whole token can be taken from its client's
//! bucket. Bursts are bounded by the capacity and the sustained rate by the refill
//! rate.
//!
//! ## Key Concepts
//!
//! * **Lazy Evaluation**: Tokens are recalculated at the moment of the request,
//!   eliminating the need for background worker threads or timers.
//! * **Sharded Locking**: Buckets live in a sharded map. Refill and consume run
//!   under the shard guard of the key, so they are atomic per key while unrelated
//!   keys proceed in parallel.
//! * **Strategy Trait**: A unified, key-aware interface the HTTP layer is generic over.
//!
//! ## Example
//!
//! ```rust
//! use bucket_limit::KeyedLimiter;
//! use bucket_limit::Quota;
//! use bucket_limit::Strategy;
//! use std::num::NonZeroUsize;
//!
//! let quota = Quota::new(NonZeroUsize::new(10).unwrap(), 1.0).unwrap();
//! let limiter = KeyedLimiter::new(quota);
//!
//! if limiter.process("1.2.3.4").is_continue() {
//!     // Request allowed
//! }
//! ```

use std::fmt::Debug;
use std::ops::ControlFlow;
use std::time::Duration;

mod limiter;
mod quota;
mod store;
mod token_bucket;

pub use limiter::KeyedLimiter;
pub use quota::DEFAULT_CAPACITY;
pub use quota::DEFAULT_REFILL_RATE;
pub use quota::Quota;
pub use quota::QuotaError;
pub use store::BucketStore;
pub use token_bucket::TokenBucket;

/// Reasons why a request might be rejected by a strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reason {
    Overloaded { retry_after: Duration },
}

/// The core trait for keyed rate-limiting strategies.
///
/// The HTTP layer holds a strategy behind an `Arc` and places no further bounds on
/// it. Serving from a multi-threaded runtime additionally needs the strategy to be
/// `Send` and `Sync`, which [`KeyedLimiter`] is.
pub trait Strategy: Debug {
    /// Attempts to admit a single request from the client identified by `key`.
    ///
    /// This method never blocks on I/O.
    ///
    /// # Errors
    ///
    /// Returns `Reason` if the client has exhausted its allowance.
    fn process(&self, key: &str) -> ControlFlow<Reason>;
}
