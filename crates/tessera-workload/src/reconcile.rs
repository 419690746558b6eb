//! Resolves pending operations into confirmed model state.
//!
//! Runs after every committed attempt and after setup. Deletions resolve
//! locally; creations are resolved by reading back the identifier the store
//! assigned to each created tenant. Also home to the per-cycle data cleanup.

use bytes::Bytes;
use tessera_store::{Database, Transaction, run_transaction};
use tracing::debug;

use tessera_types::TransactionOption;

use crate::admin::{decode_assigned_identifier, encode_data_clear, tenant_map_key, tenant_name};
use crate::error::WorkloadError;
use crate::model::TenantModel;

/// What a reconciliation pass confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub created: usize,
    pub deleted: usize,
}

/// Applies the outcome of a committed attempt to `model`.
pub fn reconcile<D: Database>(
    db: &D,
    model: &mut TenantModel,
) -> Result<ReconcileOutcome, WorkloadError> {
    let mut outcome = ReconcileOutcome::default();

    let deletes: Vec<_> = model.pending_deletes().collect();
    for slot in deletes {
        if model.reconcile_delete(slot).is_some() {
            outcome.deleted += 1;
        }
    }

    let creates: Vec<_> = model.pending_creates().collect();
    if !creates.is_empty() {
        let entries: Vec<Option<Bytes>> = run_transaction(db, |tr| {
            creates
                .iter()
                .map(|&slot| tr.get(&tenant_map_key(slot)))
                .collect()
        })?;

        for (&slot, entry) in creates.iter().zip(entries) {
            let Some(raw) = entry else {
                return Err(WorkloadError::MissingTenant {
                    slot,
                    name: tenant_name(slot),
                });
            };
            let id = decode_assigned_identifier(&raw)
                .map_err(|source| WorkloadError::Decode { slot, source })?;
            model.reconcile_create(slot, id)?;
            outcome.created += 1;
        }
    }

    model.abandon_pending();
    model.check_consistency()?;
    debug!(created = outcome.created, deleted = outcome.deleted, "reconciled");
    Ok(outcome)
}

/// Clears the data key of every confirmed tenant so later deletions find an
/// empty data range. Returns the number of keys cleared.
pub fn clear_tenant_data<D: Database>(db: &D, model: &TenantModel) -> Result<usize, WorkloadError> {
    let clears: Vec<_> = model.confirmed().map(|(_, id)| encode_data_clear(id)).collect();
    if clears.is_empty() {
        return Ok(0);
    }
    run_transaction(db, |tr| {
        tr.set_option(TransactionOption::RawAccess);
        for mutation in &clears {
            tr.clear(mutation.key());
        }
        Ok(())
    })?;
    Ok(clears.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{encode_create, encode_delete};
    use tessera_sim::{SimClock, SimDatabase, SimStoreConfig};
    use tessera_types::{Mutation, TenantId, TenantSlot};

    fn apply(db: &SimDatabase, mutations: &[Mutation]) {
        let mut tr = db.create_transaction();
        tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
        for mutation in mutations {
            match mutation {
                Mutation::Set { key, value } => tr.set(key, value),
                Mutation::Clear { key } => tr.clear(key),
            }
        }
        tr.commit().expect("commit");
    }

    fn reliable_db() -> SimDatabase {
        SimDatabase::new(SimStoreConfig::reliable(), SimClock::new())
    }

    #[test]
    fn confirms_creates_with_store_identifiers() {
        let db = reliable_db();
        let mut model = TenantModel::new(4);
        for index in [2, 0] {
            let slot = TenantSlot::new(index);
            model.mark_pending_create(slot).unwrap();
            apply(&db, &[encode_create(slot)]);
        }

        let outcome = reconcile(&db, &mut model).expect("reconcile");
        assert_eq!(outcome, ReconcileOutcome { created: 2, deleted: 0 });
        // Slot 2 was created first and received the first identifier.
        assert_eq!(model.id_for(TenantSlot::new(2)), Some(TenantId::new(0)));
        assert_eq!(model.id_for(TenantSlot::new(0)), Some(TenantId::new(1)));
        assert!(!model.has_pending());
    }

    #[test]
    fn confirms_deletes_without_reading() {
        let db = reliable_db();
        let slot = TenantSlot::new(0);
        let mut model = TenantModel::new(1);
        model.mark_pending_create(slot).unwrap();
        apply(&db, &[encode_create(slot)]);
        reconcile(&db, &mut model).unwrap();

        model.mark_pending_delete(slot).unwrap();
        apply(&db, &[encode_delete(slot)]);
        let outcome = reconcile(&db, &mut model).unwrap();

        assert_eq!(outcome.deleted, 1);
        assert_eq!(model.confirmed_count(), 0);
    }

    #[test]
    fn missing_tenant_is_fatal() {
        let db = reliable_db();
        let mut model = TenantModel::new(2);
        model.mark_pending_create(TenantSlot::new(1)).unwrap();

        let err = reconcile(&db, &mut model).expect_err("nothing was created");
        assert!(matches!(err, WorkloadError::MissingTenant { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn retries_transient_read_faults() {
        let mut config = SimStoreConfig::reliable();
        config.read_fault_probability = 0.2;
        let db = SimDatabase::new(config, SimClock::new());
        let mut model = TenantModel::new(8);
        for index in 0..8 {
            let slot = TenantSlot::new(index);
            model.mark_pending_create(slot).unwrap();
            apply(&db, &[encode_create(slot)]);
        }

        let outcome = reconcile(&db, &mut model).expect("read faults are retried");
        assert_eq!(outcome.created, 8);
        model.check_consistency().unwrap();
    }

    #[test]
    fn clearing_data_allows_deletion() {
        let db = reliable_db();
        let slot = TenantSlot::new(0);
        let mut model = TenantModel::new(1);
        model.mark_pending_create(slot).unwrap();
        apply(&db, &[encode_create(slot)]);
        reconcile(&db, &mut model).unwrap();

        let id = model.id_for(slot).unwrap();
        let mut tr = db.create_transaction();
        tr.set_option(TransactionOption::RawAccess);
        tr.set(&id.data_key(b"key"), b"value");
        tr.commit().unwrap();
        assert_eq!(db.data_key_count(), 1);

        assert_eq!(clear_tenant_data(&db, &model).unwrap(), 1);
        assert_eq!(db.data_key_count(), 0);
        apply(&db, &[encode_delete(slot)]);
        assert_eq!(db.tenant_count(), 0);
    }

    #[test]
    fn clearing_nothing_is_free() {
        let db = reliable_db();
        assert_eq!(clear_tenant_data(&db, &TenantModel::new(3)).unwrap(), 0);
        assert_eq!(db.stats().commits, 0);
    }
}
