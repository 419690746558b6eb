//! Execution of one randomized attempt with retries.
//!
//! ```text
//!              ┌──────────────── retryable error ─────────────────┐
//!              ▼                                                  │
//!  ──► Building ──► Submitted ──► Committed                   Retrying
//!        │              │                                         ▲
//!        │              ├──────────── retryable ──────────────────┘
//!        │              └──── non-retryable ──► Aborted
//!        └── deadline passed before a rebuild ──► Abandoned
//! ```
//!
//! The model's pending markers persist across retries and are resolved by
//! reconciliation after the commit, or dropped when the attempt is abandoned.

use tessera_sim::SimRng;
use tessera_store::{Clock, Database, StoreError, Transaction};
use tessera_types::{Mutation, TransactionOption};
use tracing::{debug, error, warn};

use crate::error::WorkloadError;
use crate::model::TenantModel;
use crate::oracle::IllegalAccessOracle;
use crate::planner::{AttemptPlan, PlannedOp, TransactionPlanner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Building,
    Submitted,
    Committed,
    Retrying,
    Aborted,
    Abandoned,
}

/// Operations planned across all tries of an attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub creates: usize,
    pub deletes: usize,
    pub illegal_writes: usize,
    pub legal_writes: usize,
}

impl OpCounts {
    fn add(&mut self, plan: &AttemptPlan) {
        self.creates += plan.count(|op| matches!(op, PlannedOp::CreateTenant(_)));
        self.deletes += plan.count(|op| matches!(op, PlannedOp::DeleteTenant(_)));
        self.illegal_writes += plan.count(|op| matches!(op, PlannedOp::IllegalWrite(_)));
        self.legal_writes += plan.count(|op| matches!(op, PlannedOp::LegalWrite { .. }));
    }
}

/// Summary of a finished attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptReport {
    pub tries: u32,
    pub illegal_attempted: bool,
    pub illegal_observed: bool,
    pub illegal_rejections: u32,
    pub ops: OpCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The attempt committed and passed the oracle; reconcile next.
    Committed(AttemptReport),
    /// The deadline passed between tries; pending markers were dropped.
    Abandoned(AttemptReport),
}

impl AttemptOutcome {
    pub fn report(&self) -> &AttemptReport {
        match self {
            Self::Committed(report) | Self::Abandoned(report) => report,
        }
    }
}

/// Drives one attempt to completion.
pub struct AttemptRunner<'a> {
    planner: &'a TransactionPlanner,
    clock: &'a dyn Clock,
    deadline_ns: u64,
    state: AttemptState,
}

impl<'a> AttemptRunner<'a> {
    pub fn new(planner: &'a TransactionPlanner, clock: &'a dyn Clock, deadline_ns: u64) -> Self {
        Self {
            planner,
            clock,
            deadline_ns,
            state: AttemptState::Building,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Plans, submits and retries until the attempt commits, aborts on a
    /// non-retryable error, or is abandoned at the deadline.
    pub fn run<D: Database>(
        &mut self,
        db: &D,
        model: &mut TenantModel,
        rng: &mut SimRng,
    ) -> Result<AttemptOutcome, WorkloadError> {
        let mut tr = db.create_transaction();
        let mut oracle = IllegalAccessOracle::new();
        let mut ops = OpCounts::default();
        let mut tries = 0u32;
        self.state = AttemptState::Building;

        loop {
            if tries > 0 && self.clock.now_ns() >= self.deadline_ns {
                self.transition(AttemptState::Abandoned);
                warn!(tries, "deadline reached mid-attempt, abandoning");
                model.abandon_pending();
                return Ok(AttemptOutcome::Abandoned(report(tries, &oracle, ops)));
            }

            self.transition(AttemptState::Building);
            let plan = self.planner.plan(model, rng)?;
            oracle.record_plan(plan.illegal_attempted);
            ops.add(&plan);
            tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
            tr.set_option(TransactionOption::RawAccess);
            for mutation in &plan.mutations {
                match mutation {
                    Mutation::Set { key, value } => tr.set(key, value),
                    Mutation::Clear { key } => tr.clear(key),
                }
            }

            tries += 1;
            self.transition(AttemptState::Submitted);
            match tr.commit() {
                Ok(()) => {
                    self.transition(AttemptState::Committed);
                    oracle.verify_commit(tries)?;
                    return Ok(AttemptOutcome::Committed(report(tries, &oracle, ops)));
                }
                Err(err) => {
                    oracle.record_error(&err);
                    self.fail_try(&mut tr, err)?;
                }
            }
        }
    }

    fn fail_try<T: Transaction>(&mut self, tr: &mut T, err: StoreError) -> Result<(), WorkloadError> {
        if err.is_retryable() {
            self.transition(AttemptState::Retrying);
            debug!(code = err.code(), %err, "attempt try failed");
        } else {
            self.transition(AttemptState::Aborted);
            error!(code = err.code(), %err, "attempt aborted");
        }
        tr.on_error(err)?;
        Ok(())
    }

    fn transition(&mut self, next: AttemptState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "attempt state");
        }
        self.state = next;
    }
}

fn report(tries: u32, oracle: &IllegalAccessOracle, ops: OpCounts) -> AttemptReport {
    AttemptReport {
        tries,
        illegal_attempted: oracle.attempted(),
        illegal_observed: oracle.observed(),
        illegal_rejections: oracle.rejections(),
        ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{encode_data_write, tenant_map_key, tenant_name};
    use crate::reconcile::{clear_tenant_data, reconcile};
    use tessera_sim::{SimClock, SimDatabase, SimStoreConfig};
    use tessera_types::TenantSlot;

    fn run_one(
        db: &SimDatabase,
        model: &mut TenantModel,
        planner: &TransactionPlanner,
        deadline_ns: u64,
        seed: u64,
    ) -> (Result<AttemptOutcome, WorkloadError>, AttemptState) {
        let clock = db.clock().clone();
        let mut runner = AttemptRunner::new(planner, &clock, deadline_ns);
        let result = runner.run(db, model, &mut SimRng::new(seed));
        (result, runner.state())
    }

    #[test]
    fn zero_capacity_commits_empty_attempt() {
        let db = SimDatabase::new(SimStoreConfig::reliable(), SimClock::new());
        let mut model = TenantModel::new(0);

        let (outcome, state) = run_one(&db, &mut model, &TransactionPlanner::default(), u64::MAX, 5);
        let outcome = outcome.expect("attempt");

        assert!(matches!(outcome, AttemptOutcome::Committed(_)));
        assert_eq!(outcome.report().tries, 1);
        assert_eq!(state, AttemptState::Committed);
    }

    #[test]
    fn illegal_writes_are_caught_and_retried() {
        let db = SimDatabase::new(SimStoreConfig::reliable(), SimClock::new());
        let mut model = TenantModel::new(64);
        let planner = TransactionPlanner::default();
        let mut any_illegal = false;

        for seed in 0..16 {
            clear_tenant_data(&db, &model).expect("cleanup");
            let (outcome, state) = run_one(&db, &mut model, &planner, u64::MAX, seed);
            let report = *outcome.expect("attempt").report();
            assert_eq!(state, AttemptState::Committed);
            assert_eq!(report.illegal_attempted, report.illegal_observed);
            if report.illegal_attempted {
                assert!(report.tries > 1);
                assert!(report.illegal_rejections >= 1);
                any_illegal = true;
            }
            reconcile(&db, &mut model).expect("reconcile");
        }
        assert!(any_illegal);
    }

    #[test]
    fn deadline_abandons_after_failed_try() {
        let db = SimDatabase::new(
            SimStoreConfig::reliable().with_conflict_probability(1.0),
            SimClock::new(),
        );
        let mut model = TenantModel::new(8);
        model.mark_pending_create(TenantSlot::new(0)).unwrap();

        let (outcome, state) = run_one(&db, &mut model, &TransactionPlanner::new(0), 0, 1);
        let outcome = outcome.expect("abandoned, not failed");

        assert!(matches!(outcome, AttemptOutcome::Abandoned(_)));
        assert_eq!(outcome.report().tries, 1);
        assert_eq!(state, AttemptState::Abandoned);
        assert!(!model.has_pending());
        assert_eq!(db.tenant_count(), 0);
    }

    #[test]
    fn non_retryable_error_aborts() {
        let db = SimDatabase::new(SimStoreConfig::reliable(), SimClock::new());
        let slot = TenantSlot::new(0);
        let mut tr = db.create_transaction();
        tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
        tr.set_option(TransactionOption::RawAccess);
        tr.set(&tenant_map_key(slot), b"");
        tr.commit().unwrap();
        let id = db.tenant_id(&tenant_name(slot)).unwrap();

        let Mutation::Set { key, value } = encode_data_write(id) else {
            unreachable!()
        };
        tr.set_option(TransactionOption::RawAccess);
        tr.set(&key, &value);
        tr.commit().unwrap();

        // Committed data makes the replayed delete fail non-retryably.
        let mut model = TenantModel::new(1);
        model.mark_pending_create(slot).unwrap();
        model.reconcile_create(slot, id).unwrap();
        model.mark_pending_delete(slot).unwrap();

        let (result, state) = run_one(&db, &mut model, &TransactionPlanner::new(0), u64::MAX, 1);

        assert!(matches!(
            result,
            Err(WorkloadError::Store(StoreError::TenantNotEmpty(_)))
        ));
        assert_eq!(state, AttemptState::Aborted);
        assert_eq!(db.tenant_id(&tenant_name(slot)), Some(id));
    }
}
