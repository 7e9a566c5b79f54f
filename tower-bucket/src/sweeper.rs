use std::sync::Arc;
use std::time::Duration;

use bucket_limit::KeyedLimiter;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::time::interval;
use tracing::debug;

/// Shortest period between two idle sweeps.
pub const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// Spawn a task that evicts idle client buckets from `limiter` every `every`.
///
/// Only buckets that have fully refilled are evicted, so admission decisions are
/// unchanged; the sweep just bounds memory by the number of recently active clients.
/// Periods shorter than [`MIN_SWEEP_PERIOD`] are raised to it. Abort the returned
/// handle to stop sweeping.
pub fn spawn_idle_sweeper(limiter: Arc<KeyedLimiter>, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_SWEEP_PERIOD);
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.evict_idle();
            debug!(evicted, clients = limiter.store().len(), "idle sweep");
        }
    })
}
