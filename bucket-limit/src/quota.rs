use std::num::NonZeroUsize;
use std::time::Duration;

/// Default bucket capacity.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(10).unwrap();

/// Default number of tokens added per elapsed second.
pub const DEFAULT_REFILL_RATE: f64 = 1.0;

/// Fixed-point resolution of a bucket: one token is 10^18 units.
///
/// A refill rate is held in units per nanosecond (nano-tokens per second), so
/// `elapsed_ns * rate` is an exact integer and repeated refills never lose a fraction.
pub(crate) const UNITS_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Errors produced while building a [`Quota`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuotaError {
    /// The refill rate must be a finite number of tokens per second greater than zero.
    #[error("refill rate must be finite and positive, got {0}")]
    InvalidRefillRate(f64),

    /// The refill rate is below one nano-token per second.
    #[error("refill rate {0} is below the minimum of 1e-9 tokens per second")]
    RefillRateTooSmall(f64),
}

/// The capacity and refill rate shared by every bucket of a limiter.
///
/// A quota is fixed at startup; there is no way to change it on a running limiter.
/// The refill rate is kept with nano-token per second precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quota {
    capacity: NonZeroUsize,
    refill_rate: f64,
    /// Units added per elapsed nanosecond.
    units_per_nano: u128,
}

impl Default for Quota {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            refill_rate: DEFAULT_REFILL_RATE,
            units_per_nano: NANOS_PER_SEC,
        }
    }
}

impl Quota {
    /// Create a quota of `capacity` tokens refilled at `refill_rate` tokens per second.
    pub fn new(capacity: NonZeroUsize, refill_rate: f64) -> Result<Self, QuotaError> {
        if !refill_rate.is_finite() || refill_rate <= 0.0 {
            return Err(QuotaError::InvalidRefillRate(refill_rate));
        }
        // Saturates for absurdly large rates, which still refill instantly.
        let units_per_nano = (refill_rate * NANOS_PER_SEC as f64).round() as u128;
        if units_per_nano == 0 {
            return Err(QuotaError::RefillRateTooSmall(refill_rate));
        }
        Ok(Self {
            capacity,
            refill_rate,
            units_per_nano,
        })
    }

    /// A quota that refills its whole capacity every second.
    pub fn per_second(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            refill_rate: capacity.get() as f64,
            units_per_nano: capacity.get() as u128 * NANOS_PER_SEC,
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    /// Time it takes an empty bucket to refill completely.
    ///
    /// Saturates at `Duration::MAX`.
    pub fn replenish_interval(&self) -> Duration {
        self.time_to_accrue(self.max_units())
    }

    pub(crate) fn max_units(&self) -> u128 {
        self.capacity.get() as u128 * UNITS_PER_TOKEN
    }

    pub(crate) fn units_per_nano(&self) -> u128 {
        self.units_per_nano
    }

    /// Time until `units` have been refilled, rounded up to the nanosecond.
    pub(crate) fn time_to_accrue(&self, units: u128) -> Duration {
        let nanos = units.div_ceil(self.units_per_nano);
        match u64::try_from(nanos / NANOS_PER_SEC) {
            Ok(secs) => Duration::new(secs, (nanos % NANOS_PER_SEC) as u32),
            Err(_) => Duration::MAX,
        }
    }
}
