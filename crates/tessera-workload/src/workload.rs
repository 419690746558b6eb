//! The workload lifecycle shared by every registered workload.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tessera_store::{Clock, Database};

use crate::error::WorkloadError;
use crate::options::WorkloadOptions;

/// Everything a workload instance is constructed from.
#[derive(Clone)]
pub struct WorkloadContext {
    /// Index of this client in `[0, client_count)`.
    pub client_id: usize,
    pub client_count: usize,
    /// Run seed; each client derives its own RNG stream from it.
    pub seed: u64,
    pub options: WorkloadOptions,
    /// Time source for deadlines and pacing.
    pub clock: Arc<dyn Clock>,
}

impl WorkloadContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            client_id: 0,
            client_count: 1,
            seed: 0,
            options: WorkloadOptions::new(),
            clock,
        }
    }

    pub fn with_client(mut self, client_id: usize, client_count: usize) -> Self {
        self.client_id = client_id;
        self.client_count = client_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_options(mut self, options: WorkloadOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed for this client's RNG stream.
    pub fn client_seed(&self) -> u64 {
        self.seed.wrapping_add(self.client_id as u64)
    }
}

impl fmt::Debug for WorkloadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkloadContext")
            .field("client_id", &self.client_id)
            .field("client_count", &self.client_count)
            .field("seed", &self.seed)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadSummary {
    pub cycles: u64,
    pub commits: u64,
    pub abandoned: u64,
    pub retries: u64,
    pub illegal_attempts: u64,
    pub illegal_rejections: u64,
    pub tenants_created: u64,
    pub tenants_deleted: u64,
    pub legal_writes: u64,
}

impl WorkloadSummary {
    /// Adds another client's counters.
    pub fn merge(&mut self, other: &WorkloadSummary) {
        self.cycles += other.cycles;
        self.commits += other.commits;
        self.abandoned += other.abandoned;
        self.retries += other.retries;
        self.illegal_attempts += other.illegal_attempts;
        self.illegal_rejections += other.illegal_rejections;
        self.tenants_created += other.tenants_created;
        self.tenants_deleted += other.tenants_deleted;
        self.legal_writes += other.legal_writes;
    }
}

/// A workload driven through `setup`, `start` and `check` in that order.
///
/// Every client of a run gets its own instance. Phases are run for all
/// clients before the next phase begins.
pub trait Workload<D: Database>: Send {
    fn name(&self) -> &'static str;

    /// Prepares store state before the timed phase.
    fn setup(&mut self, db: &D) -> Result<(), WorkloadError>;

    /// Runs the timed phase.
    fn start(&mut self, db: &D) -> Result<(), WorkloadError>;

    /// Validates the final state. An `Err` fails the run.
    fn check(&mut self, db: &D) -> Result<(), WorkloadError>;

    fn summary(&self) -> WorkloadSummary;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_store::SystemClock;

    #[test]
    fn client_seeds_differ_per_client() {
        let ctx = WorkloadContext::new(Arc::new(SystemClock::new())).with_seed(10);
        assert_eq!(ctx.clone().with_client(0, 3).client_seed(), 10);
        assert_eq!(ctx.with_client(2, 3).client_seed(), 12);
    }

    #[test]
    fn summaries_merge() {
        let mut total = WorkloadSummary {
            commits: 2,
            ..WorkloadSummary::default()
        };
        total.merge(&WorkloadSummary {
            commits: 3,
            legal_writes: 4,
            ..WorkloadSummary::default()
        });
        assert_eq!(total.commits, 5);
        assert_eq!(total.legal_writes, 4);
    }
}
