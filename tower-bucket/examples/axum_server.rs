use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use bucket_limit::DEFAULT_CAPACITY;
use bucket_limit::DEFAULT_REFILL_RATE;
use bucket_limit::KeyedLimiter;
use bucket_limit::Quota;
use clap::Parser;
use tower::BoxError;
use tower_bucket::RateLimitLayer;
use tower_bucket::spawn_idle_sweeper;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Serve a hello-world route behind a per-client token bucket.
#[derive(Debug, Parser)]
struct Args {
    /// Maximum burst per client
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: NonZeroUsize,

    /// Tokens added per second
    #[arg(long, default_value_t = DEFAULT_REFILL_RATE)]
    refill_rate: f64,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Seconds between idle bucket sweeps
    #[arg(long, default_value_t = 60)]
    sweep_secs: u64,

    /// Add a Retry-After header to rejections
    #[arg(long)]
    retry_after: bool,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // 1. Setup the limiter shared by every connection
    let quota = Quota::new(args.capacity, args.refill_rate)?;
    let limiter = Arc::new(KeyedLimiter::new(quota));
    let _sweeper = spawn_idle_sweeper(limiter.clone(), Duration::from_secs(args.sweep_secs));

    // 2. Build the Router; the peer address comes from ConnectInfo
    let app = Router::new()
        .route("/", get(|| async { "Hello, Bucket!" }))
        .layer(RateLimitLayer::new(limiter).with_retry_after(args.retry_after));

    // 3. Serve
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    info!(addr = %args.addr, ?quota, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
