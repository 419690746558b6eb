//! Standard backoff policy for retryable store errors.

use std::time::Duration;

use crate::clock::duration_to_ns;

/// Exponential backoff parameters applied by [`crate::Transaction::on_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            initial_backoff,
            max_backoff,
        }
    }

    /// Starts a fresh backoff sequence.
    pub fn backoff(&self) -> Backoff {
        Backoff {
            next_ns: duration_to_ns(self.initial_backoff),
            max_ns: duration_to_ns(self.max_backoff),
        }
    }
}

/// Doubling delay sequence capped at the policy maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    next_ns: u64,
    max_ns: u64,
}

impl Backoff {
    /// Returns the delay to apply now and advances the sequence.
    pub fn next_delay_ns(&mut self) -> u64 {
        let delay = self.next_ns.min(self.max_ns);
        self.next_ns = delay.saturating_mul(2).min(self.max_ns);
        delay
    }
}
