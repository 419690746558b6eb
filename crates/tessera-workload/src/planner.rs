//! Randomized operation planning for one attempt.
//!
//! A plan starts by replaying the attempt's pending markers, so a retried
//! attempt re-issues every control-plane operation it already committed to in
//! the model, then appends a fresh batch of random operations. Replay emits
//! deletions before creations; they touch disjoint slots, and this order never
//! raises the tenant count above the predicted count.

use tessera_sim::SimRng;
use tessera_types::{Mutation, TenantId, TenantSlot};
use tracing::trace;

use crate::admin::{encode_create, encode_data_write, encode_delete};
use crate::error::WorkloadError;
use crate::model::{TenantModel, slot_at};

/// Default number of random operations per attempt build.
pub const DEFAULT_OPS_PER_TRANSACTION: usize = 10;

/// A single planned operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedOp {
    /// Control-plane create re-issued from a pending marker.
    ReplayCreate(TenantSlot),
    /// Control-plane delete re-issued from a pending marker.
    ReplayDelete(TenantSlot),
    CreateTenant(TenantSlot),
    /// Delete of a confirmed slot, or cancellation of a pending create.
    DeleteTenant(TenantSlot),
    /// Raw write to an identifier the store must not accept.
    IllegalWrite(TenantId),
    /// Raw write to an active tenant.
    LegalWrite { slot: TenantSlot, id: TenantId },
}

/// Mutations and bookkeeping produced by one build of an attempt.
#[derive(Debug, Clone, Default)]
pub struct AttemptPlan {
    pub ops: Vec<PlannedOp>,
    pub mutations: Vec<Mutation>,
    pub illegal_attempted: bool,
}

impl AttemptPlan {
    fn push(&mut self, op: PlannedOp, mutation: Mutation) {
        trace!(?op, "planned");
        self.ops.push(op);
        self.mutations.push(mutation);
    }

    /// Number of ops matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&PlannedOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Create,
    Delete,
    IllegalWrite,
    LegalWrite,
}

impl OpKind {
    fn sample(rng: &mut SimRng) -> Self {
        match rng.next_usize(4) {
            0 => Self::Create,
            1 => Self::Delete,
            2 => Self::IllegalWrite,
            _ => Self::LegalWrite,
        }
    }
}

/// Builds attempt plans against a [`TenantModel`].
#[derive(Debug, Clone)]
pub struct TransactionPlanner {
    ops_per_transaction: usize,
    create_limit: Option<usize>,
}

impl Default for TransactionPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_OPS_PER_TRANSACTION)
    }
}

impl TransactionPlanner {
    pub fn new(ops_per_transaction: usize) -> Self {
        Self {
            ops_per_transaction,
            create_limit: None,
        }
    }

    /// Caps tenant creation below the model capacity, for stores running
    /// with a tenant limit.
    pub fn with_create_limit(mut self, limit: usize) -> Self {
        self.create_limit = Some(limit);
        self
    }

    pub fn ops_per_transaction(&self) -> usize {
        self.ops_per_transaction
    }

    /// Builds the next try of the current attempt, updating the model's
    /// pending markers.
    pub fn plan(&self, model: &mut TenantModel, rng: &mut SimRng) -> Result<AttemptPlan, WorkloadError> {
        let mut plan = AttemptPlan::default();

        let deletes: Vec<_> = model.pending_deletes().collect();
        for slot in deletes {
            plan.push(PlannedOp::ReplayDelete(slot), encode_delete(slot));
        }
        let creates: Vec<_> = model.pending_creates().collect();
        for slot in creates {
            plan.push(PlannedOp::ReplayCreate(slot), encode_create(slot));
        }

        let capacity = model.capacity();
        let create_limit = self.create_limit.map_or(capacity, |limit| limit.min(capacity));

        for _ in 0..self.ops_per_transaction {
            match OpKind::sample(rng) {
                OpKind::Create => {
                    if model.predicted_count() >= create_limit {
                        continue;
                    }
                    let Some(slot) = model.pick_slot_for_create(rng) else {
                        continue;
                    };
                    model.mark_pending_create(slot)?;
                    plan.push(PlannedOp::CreateTenant(slot), encode_create(slot));
                }
                OpKind::Delete => {
                    if model.predicted_count() == 0 {
                        continue;
                    }
                    let Some(slot) = model.pick_slot_for_delete(rng) else {
                        continue;
                    };
                    model.mark_pending_delete(slot)?;
                    plan.push(PlannedOp::DeleteTenant(slot), encode_delete(slot));
                }
                OpKind::IllegalWrite => {
                    if model.predicted_count() >= capacity {
                        continue;
                    }
                    let id = illegal_target(model, rng);
                    plan.illegal_attempted = true;
                    plan.push(PlannedOp::IllegalWrite(id), encode_data_write(id));
                }
                OpKind::LegalWrite => {
                    if model.predicted_count() >= capacity || !model.has_active_slot() {
                        continue;
                    }
                    let hint = slot_at(rng.next_usize(capacity));
                    let Some(slot) = model.pick_active_slot_near(hint) else {
                        continue;
                    };
                    let Some(id) = model.id_for(slot) else {
                        continue;
                    };
                    plan.push(PlannedOp::LegalWrite { slot, id }, encode_data_write(id));
                }
            }
        }

        Ok(plan)
    }
}

/// Picks an identifier the store must reject: either a tenant deleted earlier
/// in this attempt, or a random identifier the model does not know.
fn illegal_target(model: &TenantModel, rng: &mut SimRng) -> TenantId {
    if let Some((_, id)) = model.lowest_pending_delete() {
        if rng.next_bool() {
            return id;
        }
    }
    loop {
        let id = TenantId::new(rng.next_i64_range(0, i64::MAX));
        if !model.is_bound(id) {
            return id;
        }
    }
}
