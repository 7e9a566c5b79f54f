//! # Tower Bucket
//!
//! `tower-bucket` puts a per-client token bucket in front of any
//! [Tower](https://github.com/tower-rs/tower) HTTP service.
//!
//! ## The Stack
//! [`RateLimitLayer`] wraps an inner `Service<http::Request<_>>`:
//!
//! 1. **Key Extraction**: A [`KeyExtractor`] derives the client key of each request,
//!    by default the connected peer's IP address ([`PeerIp`]). Requests with no
//!    identifiable client share the [`UNKNOWN_CLIENT`] bucket.
//! 2. **Admission**: The key is passed to a [`bucket_limit::Strategy`], normally a
//!    [`bucket_limit::KeyedLimiter`].
//! 3. **Rejection**: Denied requests never reach the inner service. They are answered
//!    with `429 Too Many Requests`, `Content-Type: text/plain` and the body
//!    `Too Many Requests`, optionally with a `Retry-After` header.
//!
//! Buckets of clients that went quiet can be dropped with [`spawn_idle_sweeper`].
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`LimitError`] and reads the peer address from
//!   `axum::extract::ConnectInfo`.

mod error;
mod key;
mod layer;
mod service;
mod sweeper;
mod utils;


pub use error::LimitError;
pub use error::TOO_MANY_REQUESTS;
pub use key::ForwardedFor;
pub use key::KeyExtractor;
pub use key::PeerIp;
pub use key::UNKNOWN_CLIENT;
pub use layer::RateLimitLayer;
pub use service::RateLimitService;
pub use service::ResponseFuture;
pub use sweeper::MIN_SWEEP_PERIOD;
pub use sweeper::spawn_idle_sweeper;
pub use utils::ServiceBuilderExt;
