//! Client-side model of the tenants a workload believes exist.
//!
//! Every slot in `[0, capacity)` is in exactly one [`SlotState`]. Confirmed
//! slots carry the identifier the store assigned; pending markers record
//! control-plane operations issued by the current attempt that have not
//! committed yet.
//!
//! # Invariants
//!
//! - `idx2tid` and `tid2idx` are exact inverses.
//! - A pending create targets an unconfirmed slot; a pending delete targets a
//!   confirmed slot. No slot carries both markers.
//! - `predicted_count()` stays in `[0, capacity]`.
//! - An identifier, once retired by a confirmed deletion, is never bound again.

use std::collections::{BTreeMap, BTreeSet};

use tessera_sim::SimRng;
use tessera_types::{TenantId, TenantSlot};
use tracing::{debug, error};

use crate::error::WorkloadError;

/// Lifecycle state of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never created, or deletion confirmed.
    Absent,
    /// Creation issued in the current attempt; unconfirmed.
    PendingCreate,
    /// Confirmed and not marked for deletion.
    Active(TenantId),
    /// Confirmed, with deletion issued in the current attempt.
    PendingDelete(TenantId),
}

impl SlotState {
    pub fn is_active(self) -> bool {
        matches!(self, SlotState::Active(_))
    }
}

/// Tenant bookkeeping for one workload instance.
#[derive(Debug, Clone)]
pub struct TenantModel {
    capacity: usize,
    idx2tid: BTreeMap<TenantSlot, TenantId>,
    tid2idx: BTreeMap<TenantId, TenantSlot>,
    pending_create: BTreeSet<TenantSlot>,
    pending_delete: BTreeSet<TenantSlot>,
    retired: BTreeSet<TenantId>,
}

impl TenantModel {
    /// Creates an empty model over `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            idx2tid: BTreeMap::new(),
            tid2idx: BTreeMap::new(),
            pending_create: BTreeSet::new(),
            pending_delete: BTreeSet::new(),
            retired: BTreeSet::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Tenant count the store will hold if the current attempt commits.
    pub fn predicted_count(&self) -> usize {
        self.idx2tid.len() + self.pending_create.len() - self.pending_delete.len()
    }

    pub fn confirmed_count(&self) -> usize {
        self.idx2tid.len()
    }

    pub fn slot_state(&self, slot: TenantSlot) -> SlotState {
        match self.idx2tid.get(&slot) {
            Some(&id) if self.pending_delete.contains(&slot) => SlotState::PendingDelete(id),
            Some(&id) => SlotState::Active(id),
            None if self.pending_create.contains(&slot) => SlotState::PendingCreate,
            None => SlotState::Absent,
        }
    }

    /// Confirmed slots and their identifiers, in slot order.
    pub fn confirmed(&self) -> impl Iterator<Item = (TenantSlot, TenantId)> + '_ {
        self.idx2tid.iter().map(|(&slot, &id)| (slot, id))
    }

    pub fn pending_creates(&self) -> impl Iterator<Item = TenantSlot> + '_ {
        self.pending_create.iter().copied()
    }

    pub fn pending_deletes(&self) -> impl Iterator<Item = TenantSlot> + '_ {
        self.pending_delete.iter().copied()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_create.is_empty() || !self.pending_delete.is_empty()
    }

    pub fn id_for(&self, slot: TenantSlot) -> Option<TenantId> {
        self.idx2tid.get(&slot).copied()
    }

    pub fn slot_for(&self, id: TenantId) -> Option<TenantSlot> {
        self.tid2idx.get(&id).copied()
    }

    /// Returns true if `id` is bound to a confirmed slot.
    pub fn is_bound(&self, id: TenantId) -> bool {
        self.tid2idx.contains_key(&id)
    }

    pub fn has_active_slot(&self) -> bool {
        self.idx2tid.len() > self.pending_delete.len()
    }

    /// Lowest-indexed slot marked for deletion, with its identifier.
    pub fn lowest_pending_delete(&self) -> Option<(TenantSlot, TenantId)> {
        let slot = *self.pending_delete.first()?;
        self.id_for(slot).map(|id| (slot, id))
    }

    // ========================================================================
    // Slot Selection
    // ========================================================================

    /// Picks an `Absent` slot, scanning forward from a random start.
    pub fn pick_slot_for_create(&self, rng: &mut SimRng) -> Option<TenantSlot> {
        self.scan_from_random(rng, |state| state == SlotState::Absent)
    }

    /// Picks a confirmed or pending-create slot not already marked for
    /// deletion, scanning forward from a random start.
    pub fn pick_slot_for_delete(&self, rng: &mut SimRng) -> Option<TenantSlot> {
        self.scan_from_random(rng, |state| {
            matches!(state, SlotState::Active(_) | SlotState::PendingCreate)
        })
    }

    /// Picks the `Active` slot with the smallest index `>= hint`, wrapping to
    /// the smallest `Active` index.
    pub fn pick_active_slot_near(&self, hint: TenantSlot) -> Option<TenantSlot> {
        let active = |slot: &&TenantSlot| !self.pending_delete.contains(*slot);
        self.idx2tid
            .range(hint..)
            .map(|(slot, _)| slot)
            .find(active)
            .or_else(|| self.idx2tid.range(..hint).map(|(slot, _)| slot).find(active))
            .copied()
    }

    fn scan_from_random(
        &self,
        rng: &mut SimRng,
        matches: impl Fn(SlotState) -> bool,
    ) -> Option<TenantSlot> {
        if self.capacity == 0 {
            return None;
        }
        let mut slot = slot_at(rng.next_usize(self.capacity));
        for _ in 0..self.capacity {
            if matches(self.slot_state(slot)) {
                return Some(slot);
            }
            slot = slot.wrapping_next(self.capacity);
        }
        None
    }

    // ========================================================================
    // Planning Mutators
    // ========================================================================

    /// Marks an `Absent` slot as being created by the current attempt.
    pub fn mark_pending_create(&mut self, slot: TenantSlot) -> Result<(), WorkloadError> {
        self.check_slot(slot)?;
        if self.slot_state(slot) != SlotState::Absent {
            return Err(WorkloadError::ModelInconsistent(format!(
                "cannot create slot {slot} in state {:?}",
                self.slot_state(slot)
            )));
        }
        if self.predicted_count() >= self.capacity {
            return Err(WorkloadError::ModelInconsistent(format!(
                "cannot create slot {slot}: predicted count at capacity {}",
                self.capacity
            )));
        }
        self.pending_create.insert(slot);
        Ok(())
    }

    /// Marks a slot as being deleted by the current attempt.
    ///
    /// Deleting a `PendingCreate` slot cancels the pending creation instead.
    pub fn mark_pending_delete(&mut self, slot: TenantSlot) -> Result<(), WorkloadError> {
        match self.slot_state(slot) {
            SlotState::Active(_) => {
                self.pending_delete.insert(slot);
                Ok(())
            }
            SlotState::PendingCreate => {
                self.pending_create.remove(&slot);
                Ok(())
            }
            state => Err(WorkloadError::ModelInconsistent(format!(
                "cannot delete slot {slot} in state {state:?}"
            ))),
        }
    }

    /// Discards every pending marker; nothing from the attempt was applied.
    pub fn abandon_pending(&mut self) {
        if self.has_pending() {
            debug!(
                creates = self.pending_create.len(),
                deletes = self.pending_delete.len(),
                "discarding pending tenant operations"
            );
        }
        self.pending_create.clear();
        self.pending_delete.clear();
    }

    // ========================================================================
    // Reconciliation
    // ========================================================================

    /// Binds a store-assigned identifier to a slot whose creation committed.
    pub fn reconcile_create(&mut self, slot: TenantSlot, id: TenantId) -> Result<(), WorkloadError> {
        self.check_slot(slot)?;
        if let Some(existing) = self.idx2tid.get(&slot) {
            if *existing == id {
                self.pending_create.remove(&slot);
                return Ok(());
            }
            return Err(WorkloadError::ModelInconsistent(format!(
                "slot {slot} already bound to tenant id {existing}, store reported {id}"
            )));
        }
        if self.retired.contains(&id) || self.tid2idx.contains_key(&id) {
            error!(%slot, %id, "store reused a tenant identifier");
            return Err(WorkloadError::IdentifierReused { slot, id });
        }
        debug!(%slot, %id, "tenant creation confirmed");
        self.idx2tid.insert(slot, id);
        self.tid2idx.insert(id, slot);
        self.pending_create.remove(&slot);
        Ok(())
    }

    /// Removes a slot whose deletion committed and retires its identifier.
    ///
    /// Returns the retired identifier, or `None` if the slot was not bound.
    pub fn reconcile_delete(&mut self, slot: TenantSlot) -> Option<TenantId> {
        self.pending_delete.remove(&slot);
        let id = self.idx2tid.remove(&slot)?;
        self.tid2idx.remove(&id);
        self.retired.insert(id);
        debug!(%slot, %id, "tenant deletion confirmed");
        Some(id)
    }

    // ========================================================================
    // Consistency
    // ========================================================================

    /// Verifies the map-inverse, marker and capacity invariants.
    pub fn check_consistency(&self) -> Result<(), WorkloadError> {
        let fail = |message: String| {
            error!(%message, "tenant model invariant violated");
            Err(WorkloadError::ModelInconsistent(message))
        };

        if self.idx2tid.len() != self.tid2idx.len() {
            return fail(format!(
                "idx2tid has {} entries but tid2idx has {}",
                self.idx2tid.len(),
                self.tid2idx.len()
            ));
        }
        for (&slot, &id) in &self.idx2tid {
            if slot.index() >= self.capacity {
                return fail(format!("slot {slot} outside capacity {}", self.capacity));
            }
            if self.tid2idx.get(&id) != Some(&slot) {
                return fail(format!("tid2idx does not map tenant id {id} back to slot {slot}"));
            }
            if self.retired.contains(&id) {
                return fail(format!("retired tenant id {id} is bound to slot {slot}"));
            }
        }
        if let Some(slot) = self.pending_create.iter().find(|s| self.idx2tid.contains_key(*s)) {
            return fail(format!("slot {slot} is pending create but already confirmed"));
        }
        if let Some(slot) = self.pending_delete.iter().find(|s| !self.idx2tid.contains_key(*s)) {
            return fail(format!("slot {slot} is pending delete but not confirmed"));
        }
        if self.predicted_count() > self.capacity {
            return fail(format!(
                "predicted count {} exceeds capacity {}",
                self.predicted_count(),
                self.capacity
            ));
        }
        Ok(())
    }

    fn check_slot(&self, slot: TenantSlot) -> Result<(), WorkloadError> {
        if slot.index() < self.capacity {
            Ok(())
        } else {
            Err(WorkloadError::ModelInconsistent(format!(
                "slot {slot} outside capacity {}",
                self.capacity
            )))
        }
    }
}

/// Slot for an index known to be below a `usize` capacity built from `u32`
/// slot numbers.
pub(crate) fn slot_at(index: usize) -> TenantSlot {
    TenantSlot::new(u32::try_from(index).unwrap_or(u32::MAX))
}
