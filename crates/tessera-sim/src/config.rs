//! Reference store configuration.

use tessera_store::RetryPolicy;

/// Fault injection and latency settings for [`crate::SimDatabase`].
#[derive(Debug, Clone)]
pub struct SimStoreConfig {
    /// Seed for the store's fault-injection RNG.
    pub seed: u64,
    /// Probability that a valid commit fails with `NotCommitted`.
    pub conflict_probability: f64,
    /// Probability that a valid commit fails with `TransactionTooOld`.
    pub too_old_probability: f64,
    /// Probability that a valid commit fails with `CommitUnknownResult`.
    ///
    /// The reference store never applies such a commit.
    pub unknown_result_probability: f64,
    /// Probability that a read fails with `TransactionTooOld`.
    pub read_fault_probability: f64,
    /// Minimum simulated round-trip latency (nanoseconds).
    pub min_latency_ns: u64,
    /// Maximum simulated round-trip latency (nanoseconds).
    pub max_latency_ns: u64,
    /// Backoff applied by `on_error`.
    pub retry_policy: RetryPolicy,
}

impl Default for SimStoreConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            conflict_probability: 0.02,
            too_old_probability: 0.01,
            unknown_result_probability: 0.01,
            read_fault_probability: 0.01,
            min_latency_ns: 100_000,   // 0.1ms
            max_latency_ns: 2_000_000, // 2ms
            retry_policy: RetryPolicy::default(),
        }
    }
}

impl SimStoreConfig {
    /// A store that never injects transient faults.
    pub fn reliable() -> Self {
        Self {
            conflict_probability: 0.0,
            too_old_probability: 0.0,
            unknown_result_probability: 0.0,
            read_fault_probability: 0.0,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_conflict_probability(mut self, probability: f64) -> Self {
        self.conflict_probability = probability;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}
