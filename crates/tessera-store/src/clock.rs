//! Time source abstraction.
//!
//! Every suspension point of a workload (store round-trips, retry backoff,
//! pacing delays) goes through a [`Clock`], so the same driver runs against
//! wall-clock time in production and against virtual time in simulation.

use std::time::{Duration, Instant};

/// Trait for time sources (simulation or production).
///
/// Implementations must be `Send + Sync` so one clock can be shared by all
/// concurrent drivers of a run.
pub trait Clock: Send + Sync {
    /// Returns nanoseconds elapsed since the clock's origin.
    fn now_ns(&self) -> u64;

    /// Suspends the caller for `duration_ns`.
    ///
    /// Simulation clocks advance virtual time instead of blocking.
    fn sleep_ns(&self, duration_ns: u64);

    /// Convenience wrapper over [`Clock::sleep_ns`].
    #[inline]
    fn sleep(&self, duration: Duration) {
        self.sleep_ns(duration_to_ns(duration));
    }
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ns(&self) -> u64 {
        duration_to_ns(self.origin.elapsed())
    }

    fn sleep_ns(&self, duration_ns: u64) {
        std::thread::sleep(Duration::from_nanos(duration_ns));
    }
}

/// Saturating conversion; durations beyond ~584 years clamp to `u64::MAX`.
pub fn duration_to_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Converts a (possibly fractional) number of seconds to nanoseconds.
///
/// Negative and non-finite inputs map to zero.
pub fn secs_f64_to_ns(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1_000_000_000.0) as u64
    } else {
        0
    }
}
