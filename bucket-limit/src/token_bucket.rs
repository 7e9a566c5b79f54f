use std::ops::ControlFlow;

use quanta::Instant;

use crate::Quota;
use crate::Reason;
use crate::quota::UNITS_PER_TOKEN;

/// The state of one client's bucket.
///
/// A bucket only holds its token count and the time of its last refill; the capacity
/// and refill rate come from the [`Quota`] of the limiter that owns it. Tokens are
/// fixed-point (10^18 units per token), so refills accumulate without rounding error.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    units: u128,
    last_refreshed: Instant,
}

impl TokenBucket {
    /// A bucket holding its full capacity as of `now`.
    pub fn full(quota: &Quota, now: Instant) -> Self {
        Self {
            units: quota.max_units(),
            last_refreshed: now,
        }
    }

    /// Current token count, fractional part included.
    pub fn tokens(&self) -> f64 {
        self.units as f64 / UNITS_PER_TOKEN as f64
    }

    pub fn last_refreshed(&self) -> Instant {
        self.last_refreshed
    }

    /// Add the tokens earned since the last refill, up to capacity.
    ///
    /// `last_refreshed` always moves to `now`. If the clock stepped backwards the
    /// elapsed time counts as zero.
    pub fn refill(&mut self, quota: &Quota, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refreshed).as_nanos();
        let added = elapsed.saturating_mul(quota.units_per_nano());
        self.units = self.units.saturating_add(added).min(quota.max_units());
        self.last_refreshed = now;
    }

    /// Take one whole token if there is one.
    ///
    /// A denied attempt leaves the bucket untouched and reports how long until a
    /// whole token will be available.
    pub fn try_consume(&mut self, quota: &Quota) -> ControlFlow<Reason> {
        if self.units < UNITS_PER_TOKEN {
            ControlFlow::Break(Reason::Overloaded {
                retry_after: quota.time_to_accrue(UNITS_PER_TOKEN - self.units),
            })
        } else {
            self.units -= UNITS_PER_TOKEN;
            ControlFlow::Continue(())
        }
    }
}
