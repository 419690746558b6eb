//! Tests for the reference store's tenant-isolation semantics.
//!
//! These pin down the contract the workload oracle relies on: which raw writes
//! the store must reject, which it must accept, and how the control-plane
//! range behaves.

#![cfg(not(feature = "canary-spurious-illegal-access"))]

use bytes::Bytes;
use tessera_sim::{SimClock, SimDatabase, SimStoreConfig, SimTransaction};
use tessera_store::{Clock, Database, StoreError, Transaction};
use tessera_types::{
    DATA_WRITE_KEY, DATA_WRITE_VALUE, Knob, TenantId, TenantName, TenantSlot, TransactionOption,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn reliable_db() -> SimDatabase {
    SimDatabase::new(SimStoreConfig::reliable(), SimClock::new())
}

fn name(slot: u32) -> TenantName {
    TenantName::for_slot(TenantSlot::new(slot))
}

fn admin_tx(db: &SimDatabase) -> SimTransaction {
    let mut tr = db.create_transaction();
    tr.set_option(TransactionOption::SpecialKeySpaceEnableWrites);
    tr.set_option(TransactionOption::RawAccess);
    tr
}

fn create(db: &SimDatabase, slot: u32) -> TenantId {
    let mut tr = admin_tx(db);
    tr.set(&name(slot).map_key(), b"");
    tr.commit().expect("create should commit");
    db.tenant_id(&name(slot)).expect("tenant should exist")
}

fn write(tr: &mut SimTransaction, id: TenantId) {
    tr.set(&id.data_key(DATA_WRITE_KEY), DATA_WRITE_VALUE);
}

fn read_entry(db: &SimDatabase, slot: u32) -> Option<serde_json::Value> {
    let mut tr = db.create_transaction();
    tr.get(&name(slot).map_key())
        .expect("read should succeed")
        .map(|raw| serde_json::from_slice(&raw).expect("entry should be JSON"))
}

// ============================================================================
// Control Plane
// ============================================================================

#[test]
fn created_tenant_exposes_integer_id() {
    let db = reliable_db();
    let id = create(&db, 0);

    let entry = read_entry(&db, 0).expect("entry present");
    assert_eq!(entry["id"].as_i64(), Some(id.get()));
    assert_eq!(entry["name"].as_str(), Some("tenant_idx_000000"));
}

#[test]
fn recreating_existing_tenant_is_noop() {
    let db = reliable_db();
    let first = create(&db, 3);
    let second = create(&db, 3);

    assert_eq!(first, second);
    assert_eq!(db.tenant_count(), 1);
}

#[test]
fn identifiers_are_never_reused() {
    let db = reliable_db();
    let first = create(&db, 0);

    let mut tr = admin_tx(&db);
    tr.clear(&name(0).map_key());
    tr.commit().expect("delete should commit");
    assert_eq!(read_entry(&db, 0), None);

    let second = create(&db, 0);
    assert_ne!(first, second);
    assert!(second > first);
}

#[test]
fn deleting_absent_tenant_is_noop() {
    let db = reliable_db();
    let mut tr = admin_tx(&db);
    tr.clear(&name(9).map_key());
    tr.commit().expect("noop delete should commit");
    assert_eq!(db.tenant_count(), 0);
}

#[test]
fn control_plane_writes_require_option() {
    let db = reliable_db();
    let mut tr = db.create_transaction();
    tr.set(&name(0).map_key(), b"");

    assert_eq!(tr.commit(), Err(StoreError::SpecialKeysWriteDisabled));
    assert_eq!(db.tenant_count(), 0);
}

#[test]
fn other_special_keys_are_rejected() {
    let db = reliable_db();
    let mut tr = admin_tx(&db);
    tr.set(b"\xff\xff/management/options/x", b"");

    assert_eq!(tr.commit(), Err(StoreError::InvalidSpecialKey));
}

#[test]
fn capacity_knob_limits_creation() {
    let db = reliable_db();
    db.set_knob(Knob::MaxTenantsPerCluster(2)).expect("knob");

    let mut tr = admin_tx(&db);
    for slot in 0..3 {
        tr.set(&name(slot).map_key(), b"");
    }
    let err = tr.commit().expect_err("third tenant exceeds capacity");
    assert!(matches!(err, StoreError::ClusterNoCapacity { limit: 2, .. }));
    assert!(err.is_retryable());
    assert_eq!(db.tenant_count(), 0);
    assert_eq!(db.stats().capacity_rejections, 1);
}

// ============================================================================
// Data Range
// ============================================================================

#[test]
fn raw_writes_require_option() {
    let db = reliable_db();
    let id = create(&db, 0);

    let mut tr = db.create_transaction();
    write(&mut tr, id);
    assert_eq!(tr.commit(), Err(StoreError::RawAccessRequired));
}

#[test]
fn write_to_existing_tenant_succeeds() {
    let db = reliable_db();
    let id = create(&db, 0);

    let mut tr = admin_tx(&db);
    write(&mut tr, id);
    tr.commit().expect("legal write should commit");

    let mut reader = admin_tx(&db);
    let value = reader.get(&id.data_key(DATA_WRITE_KEY)).expect("read");
    assert_eq!(value, Some(Bytes::from_static(DATA_WRITE_VALUE)));
}

#[test]
fn write_to_unknown_tenant_is_illegal() {
    let db = reliable_db();
    create(&db, 0);

    let mut tr = admin_tx(&db);
    write(&mut tr, TenantId::new(999_999));
    assert_eq!(
        tr.commit(),
        Err(StoreError::IllegalTenantAccess(TenantId::new(999_999)))
    );
    assert_eq!(db.stats().illegal_rejections, 1);
}

#[test]
fn short_raw_key_is_illegal() {
    let db = reliable_db();
    let mut tr = admin_tx(&db);
    tr.set(b"abc", b"v");
    assert_eq!(
        tr.commit(),
        Err(StoreError::IllegalTenantAccess(TenantId::INVALID))
    );
}

#[test]
#[cfg(not(feature = "canary-deleted-tenant-leak"))]
fn write_after_same_transaction_delete_is_illegal() {
    let db = reliable_db();
    let id = create(&db, 0);

    let mut tr = admin_tx(&db);
    tr.clear(&name(0).map_key());
    write(&mut tr, id);

    assert_eq!(tr.commit(), Err(StoreError::IllegalTenantAccess(id)));
    // Nothing was applied, the tenant survives.
    assert_eq!(db.tenant_id(&name(0)), Some(id));
}

#[test]
fn write_before_same_transaction_delete_is_discarded() {
    let db = reliable_db();
    let id = create(&db, 0);

    let mut tr = admin_tx(&db);
    write(&mut tr, id);
    tr.clear(&name(0).map_key());
    tr.commit().expect("write then delete should commit");

    assert_eq!(db.tenant_count(), 0);
    assert_eq!(db.data_key_count(), 0);
}

#[test]
fn write_after_same_transaction_create_is_legal() {
    let db = reliable_db();
    // The first identifier handed out is zero.
    let mut tr = admin_tx(&db);
    tr.set(&name(0).map_key(), b"");
    write(&mut tr, TenantId::new(0));
    tr.commit().expect("create then write should commit");

    assert_eq!(db.tenant_id(&name(0)), Some(TenantId::new(0)));
    assert_eq!(db.data_key_count(), 1);
}

#[test]
fn deleting_tenant_with_committed_data_fails() {
    let db = reliable_db();
    let id = create(&db, 0);

    let mut tr = admin_tx(&db);
    write(&mut tr, id);
    tr.commit().expect("legal write");

    let mut tr = admin_tx(&db);
    tr.clear(&name(0).map_key());
    let err = tr.commit().expect_err("tenant is not empty");
    assert_eq!(err, StoreError::TenantNotEmpty(name(0)));
    assert!(!err.is_retryable());

    let mut tr = admin_tx(&db);
    tr.clear(&id.data_key(DATA_WRITE_KEY));
    tr.clear(&name(0).map_key());
    tr.commit().expect("clear then delete should commit");
    assert_eq!(db.tenant_count(), 0);
}

// ============================================================================
// Faults and Time
// ============================================================================

#[test]
fn illegal_access_takes_precedence_over_injected_faults() {
    let config = SimStoreConfig::reliable().with_conflict_probability(1.0);
    let db = SimDatabase::new(config, SimClock::new());

    let mut tr = admin_tx(&db);
    write(&mut tr, TenantId::new(5));
    assert!(matches!(
        tr.commit(),
        Err(StoreError::IllegalTenantAccess(_))
    ));

    let mut tr = admin_tx(&db);
    tr.set(&name(0).map_key(), b"");
    assert_eq!(tr.commit(), Err(StoreError::NotCommitted));
    assert_eq!(db.tenant_count(), 0);
}

#[test]
fn round_trips_advance_virtual_time() {
    let db = reliable_db();
    let before = db.clock().now_ns();
    create(&db, 0);
    let after = db.clock().now_ns();

    let config = db.config();
    assert!(after - before >= config.min_latency_ns);
    assert!(after - before < config.max_latency_ns);
}

#[test]
fn on_error_propagates_non_retryable() {
    let db = reliable_db();
    let mut tr = db.create_transaction();
    assert_eq!(
        tr.on_error(StoreError::RawAccessRequired),
        Err(StoreError::RawAccessRequired)
    );
    assert_eq!(db.clock().now_ns(), 0);
}

#[test]
fn on_error_resets_buffered_writes_and_options() {
    let db = reliable_db();
    let mut tr = admin_tx(&db);
    tr.set(&name(0).map_key(), b"");

    tr.on_error(StoreError::NotCommitted).expect("retryable");
    assert!(tr.pending_writes().is_empty());

    // Options were reset too.
    tr.set(&name(0).map_key(), b"");
    assert_eq!(tr.commit(), Err(StoreError::SpecialKeysWriteDisabled));
}

#[test]
fn same_seed_same_fault_sequence() {
    fn run(seed: u64) -> Vec<bool> {
        let config = SimStoreConfig::default()
            .with_seed(seed)
            .with_conflict_probability(0.5);
        let db = SimDatabase::new(config, SimClock::new());
        (0..32)
            .map(|slot| {
                let mut tr = admin_tx(&db);
                tr.set(&name(slot).map_key(), b"");
                tr.commit().is_ok()
            })
            .collect()
    }

    assert_eq!(run(7), run(7));
}
