//! Deterministic random number generation.
//!
//! All randomness in a simulated run flows from one seed, so a failing run
//! can be replayed exactly. The store's fault injector is seeded from the
//! store config; each workload client seeds from the run seed plus its id.

use rand::rngs::SmallRng;
use rand::{Rng as _, SeedableRng};

/// Seedable, reproducible random number generator.
#[derive(Debug, Clone)]
pub struct SimRng {
    inner: SmallRng,
}

impl SimRng {
    /// Creates a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Fair coin flip.
    pub fn next_bool(&mut self) -> bool {
        self.inner.r#gen()
    }

    /// Uniform in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64 {
        self.inner.r#gen()
    }

    /// Returns `true` with the given probability.
    pub fn next_bool_with_probability(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Uniform in `[0, max)`.
    ///
    /// # Panics
    ///
    /// Panics if `max == 0`.
    pub fn next_usize(&mut self, max: usize) -> usize {
        self.inner.gen_range(0..max)
    }

    /// Uniform in `[min, max)`; returns `min` for an empty range.
    pub fn next_u64_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }

    /// Uniform in `[min, max)`; returns `min` for an empty range.
    pub fn next_i64_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        self.inner.gen_range(min..max)
    }
}
