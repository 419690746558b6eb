//! In-memory reference store enforcing tenant isolation.
//!
//! The store keeps a tenant map (name → identifier) and a flat data range.
//! Tenants are managed through the control-plane range; data is written by
//! raw identifier prefix. Commit semantics:
//!
//! 1. Option checks (non-retryable errors).
//! 2. Mutations are applied in order to a working copy. Tenant creation takes
//!    the next identifier from a counter that only advances on commit, so an
//!    identifier is never handed out twice. A raw write whose prefix does not
//!    name a tenant in the working copy *at that point* is an illegal tenant
//!    access, which is what rejects writes to a tenant deleted earlier in the
//!    same transaction.
//! 3. Only then are transient faults injected.
//! 4. The working copy replaces committed state.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use serde::Serialize;
use tessera_store::{Backoff, Clock, Database, StoreError, Transaction};
use tessera_types::{
    Knob, Mutation, TENANT_MAP_PREFIX, TENANT_PREFIX_LEN, TenantId, TenantName,
    TransactionOption, is_system_key,
};
use tracing::{debug, trace};

use crate::canary;
use crate::clock::SimClock;
use crate::config::SimStoreConfig;
use crate::rng::SimRng;

// ============================================================================
// Database
// ============================================================================

/// Shared handle to the reference store. Clones address the same store.
#[derive(Debug, Clone)]
pub struct SimDatabase {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    config: SimStoreConfig,
    clock: SimClock,
    state: Mutex<StoreState>,
}

impl SimDatabase {
    pub fn new(config: SimStoreConfig, clock: SimClock) -> Self {
        let rng = SimRng::new(config.seed);
        Self {
            shared: Arc::new(Shared {
                config,
                clock,
                state: Mutex::new(StoreState::new(rng)),
            }),
        }
    }

    /// Returns the clock this store advances on every round-trip.
    pub fn clock(&self) -> &SimClock {
        &self.shared.clock
    }

    pub fn config(&self) -> &SimStoreConfig {
        &self.shared.config
    }

    /// Committed identifier of a tenant, if it exists.
    pub fn tenant_id(&self, name: &TenantName) -> Option<TenantId> {
        self.lock().ok()?.tenants.get(name).map(|record| record.id)
    }

    /// Number of committed tenants.
    pub fn tenant_count(&self) -> usize {
        self.lock().map(|state| state.tenants.len()).unwrap_or(0)
    }

    /// Number of committed raw data keys.
    pub fn data_key_count(&self) -> usize {
        self.lock().map(|state| state.data.len()).unwrap_or(0)
    }

    /// Snapshot of the store's counters.
    pub fn stats(&self) -> SimStats {
        self.lock().map(|state| state.stats).unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.shared
            .state
            .lock()
            .map_err(|_| StoreError::Internal("store state mutex poisoned".to_string()))
    }

    /// Advances the clock by one simulated round-trip.
    fn round_trip(&self, state: &mut StoreState) {
        let config = &self.shared.config;
        let latency = state
            .rng
            .next_u64_range(config.min_latency_ns, config.max_latency_ns);
        self.shared.clock.advance_by(latency);
    }
}

impl Database for SimDatabase {
    type Transaction = SimTransaction;

    fn create_transaction(&self) -> SimTransaction {
        SimTransaction {
            db: self.clone(),
            options: TransactionOptions::default(),
            writes: Vec::new(),
            backoff: self.shared.config.retry_policy.backoff(),
        }
    }

    fn set_knob(&self, knob: Knob) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match knob {
            Knob::MaxTenantsPerCluster(limit) => {
                debug!(limit, "max_tenants_per_cluster set");
                state.max_tenants = Some(limit);
            }
        }
        Ok(())
    }
}

/// Counters maintained by the reference store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    pub commits: u64,
    pub tenants_created: u64,
    pub tenants_deleted: u64,
    pub illegal_rejections: u64,
    pub capacity_rejections: u64,
    pub injected_faults: u64,
}

// ============================================================================
// Committed State
// ============================================================================

#[derive(Debug, Clone)]
struct TenantRecord {
    id: TenantId,
}

/// Metadata document returned when reading a tenant-map key.
#[derive(Debug, Serialize)]
struct TenantMapEntry<'a> {
    id: i64,
    prefix: String,
    name: &'a str,
    tenant_state: &'static str,
}

#[derive(Debug)]
struct StoreState {
    tenants: BTreeMap<TenantName, TenantRecord>,
    ids: BTreeMap<TenantId, TenantName>,
    data: BTreeMap<Bytes, Bytes>,
    next_tenant_id: i64,
    max_tenants: Option<usize>,
    rng: SimRng,
    stats: SimStats,
}

/// Working copy a commit is validated against.
struct WorkingSet {
    tenants: BTreeMap<TenantName, TenantRecord>,
    ids: BTreeMap<TenantId, TenantName>,
    overlay: BTreeMap<Bytes, Option<Bytes>>,
    next_tenant_id: i64,
    deleted: BTreeSet<TenantId>,
    created: u64,
}

impl StoreState {
    fn new(rng: SimRng) -> Self {
        Self {
            tenants: BTreeMap::new(),
            ids: BTreeMap::new(),
            data: BTreeMap::new(),
            next_tenant_id: 0,
            max_tenants: None,
            rng,
            stats: SimStats::default(),
        }
    }

    fn read(&mut self, options: TransactionOptions, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        if let Some(name) = TenantName::from_map_key(key) {
            let Some(record) = self.tenants.get(&name) else {
                return Ok(None);
            };
            let entry = TenantMapEntry {
                id: record.id.get(),
                prefix: printable(&record.id.to_prefix()),
                name: name.as_str(),
                tenant_state: "ready",
            };
            let json = serde_json::to_vec(&entry)
                .map_err(|e| StoreError::Internal(format!("tenant entry encoding: {e}")))?;
            return Ok(Some(Bytes::from(json)));
        }
        if is_system_key(key) {
            return Ok(None);
        }
        if !options.raw_access {
            return Err(StoreError::RawAccessRequired);
        }
        Ok(self.data.get(key).cloned())
    }

    fn commit(
        &mut self,
        config: &SimStoreConfig,
        options: TransactionOptions,
        writes: &[Mutation],
    ) -> Result<(), StoreError> {
        for mutation in writes {
            if mutation.is_system() {
                if !options.special_key_writes {
                    return Err(StoreError::SpecialKeysWriteDisabled);
                }
                if !mutation.key().starts_with(TENANT_MAP_PREFIX) {
                    return Err(StoreError::InvalidSpecialKey);
                }
            } else if !options.raw_access {
                return Err(StoreError::RawAccessRequired);
            }
        }

        let mut working = WorkingSet {
            tenants: self.tenants.clone(),
            ids: self.ids.clone(),
            overlay: BTreeMap::new(),
            next_tenant_id: self.next_tenant_id,
            deleted: BTreeSet::new(),
            created: 0,
        };

        for mutation in writes {
            let applied = match mutation {
                Mutation::Set { key, value } => match TenantName::from_map_key(key) {
                    Some(name) => self.create_tenant(&mut working, name),
                    None => self.write_data(&mut working, key, Some(value.clone())),
                },
                Mutation::Clear { key } => match TenantName::from_map_key(key) {
                    Some(name) => self.delete_tenant(&mut working, &name),
                    None => self.write_data(&mut working, key, None),
                },
            };
            if let Err(error) = applied {
                match error {
                    StoreError::IllegalTenantAccess(_) => self.stats.illegal_rejections += 1,
                    StoreError::ClusterNoCapacity { .. } => self.stats.capacity_rejections += 1,
                    _ => {}
                }
                return Err(error);
            }
        }

        if let Some(fault) = self.inject_commit_fault(config) {
            self.stats.injected_faults += 1;
            return Err(fault);
        }

        let deleted = working.deleted.len() as u64;
        self.tenants = working.tenants;
        self.ids = working.ids;
        self.next_tenant_id = working.next_tenant_id;
        for (key, value) in working.overlay {
            match value {
                Some(value) => {
                    self.data.insert(key, value);
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
        self.stats.commits += 1;
        self.stats.tenants_created += working.created;
        self.stats.tenants_deleted += deleted;
        Ok(())
    }

    fn create_tenant(&self, working: &mut WorkingSet, name: TenantName) -> Result<(), StoreError> {
        if working.tenants.contains_key(&name) {
            return Ok(());
        }
        if let Some(limit) = self.max_tenants {
            if working.tenants.len() >= limit {
                return Err(StoreError::ClusterNoCapacity { name, limit });
            }
        }
        let id = TenantId::new(working.next_tenant_id);
        working.next_tenant_id += 1;
        working.created += 1;
        trace!(%name, %id, "tenant created");
        working.ids.insert(id, name.clone());
        working.tenants.insert(name, TenantRecord { id });
        Ok(())
    }

    fn delete_tenant(&self, working: &mut WorkingSet, name: &TenantName) -> Result<(), StoreError> {
        let Some(record) = working.tenants.get(name) else {
            return Ok(());
        };
        let id = record.id;
        let prefix = id.to_prefix();
        if self.has_committed_data(&prefix) {
            return Err(StoreError::TenantNotEmpty(name.clone()));
        }
        working.overlay.retain(|key, _| !key.starts_with(&prefix));
        working.tenants.remove(name);
        working.ids.remove(&id);
        working.deleted.insert(id);
        trace!(%name, %id, "tenant deleted");
        Ok(())
    }

    fn write_data(
        &mut self,
        working: &mut WorkingSet,
        key: &Bytes,
        value: Option<Bytes>,
    ) -> Result<(), StoreError> {
        let id = TenantId::from_prefix(key).filter(|id| id.is_valid());
        let allowed = id.is_some_and(|id| {
            working.ids.contains_key(&id) || canary::leak_deleted_tenant(working.deleted.contains(&id))
        });
        if !allowed || canary::spurious_illegal_access(&mut self.rng) {
            return Err(StoreError::IllegalTenantAccess(
                id.unwrap_or(TenantId::INVALID),
            ));
        }
        working.overlay.insert(key.clone(), value);
        Ok(())
    }

    fn has_committed_data(&self, prefix: &[u8; TENANT_PREFIX_LEN]) -> bool {
        self.data
            .range::<[u8], _>((Bound::Included(&prefix[..]), Bound::Unbounded))
            .next()
            .is_some_and(|(key, _)| key.starts_with(prefix))
    }

    fn inject_commit_fault(&mut self, config: &SimStoreConfig) -> Option<StoreError> {
        if self.rng.next_bool_with_probability(config.conflict_probability) {
            Some(StoreError::NotCommitted)
        } else if self.rng.next_bool_with_probability(config.too_old_probability) {
            Some(StoreError::TransactionTooOld)
        } else if self
            .rng
            .next_bool_with_probability(config.unknown_result_probability)
        {
            Some(StoreError::CommitUnknownResult)
        } else {
            None
        }
    }
}

/// Renders bytes with non-printable characters escaped as `\xNN`.
fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() && b != b'\\' {
                char::from(b).to_string()
            } else {
                format!("\\x{b:02x}")
            }
        })
        .collect()
}

// ============================================================================
// Transaction
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct TransactionOptions {
    special_key_writes: bool,
    raw_access: bool,
}

/// A transaction against [`SimDatabase`].
#[derive(Debug)]
pub struct SimTransaction {
    db: SimDatabase,
    options: TransactionOptions,
    writes: Vec<Mutation>,
    backoff: Backoff,
}

impl SimTransaction {
    /// Buffered writes of the current try, in order.
    pub fn pending_writes(&self) -> &[Mutation] {
        &self.writes
    }
}

impl Transaction for SimTransaction {
    fn set_option(&mut self, option: TransactionOption) {
        match option {
            TransactionOption::SpecialKeySpaceEnableWrites => self.options.special_key_writes = true,
            TransactionOption::RawAccess => self.options.raw_access = true,
        }
    }

    fn get(&mut self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        let mut state = self.db.lock()?;
        self.db.round_trip(&mut state);
        let fault_probability = self.db.shared.config.read_fault_probability;
        if state.rng.next_bool_with_probability(fault_probability) {
            state.stats.injected_faults += 1;
            return Err(StoreError::TransactionTooOld);
        }
        state.read(self.options, key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) {
        self.writes
            .push(Mutation::set(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value)));
    }

    fn clear(&mut self, key: &[u8]) {
        self.writes.push(Mutation::clear(Bytes::copy_from_slice(key)));
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let mut state = self.db.lock()?;
        self.db.round_trip(&mut state);
        let result = state.commit(&self.db.shared.config, self.options, &self.writes);
        drop(state);
        if result.is_ok() {
            self.writes.clear();
        }
        result
    }

    fn on_error(&mut self, error: StoreError) -> Result<(), StoreError> {
        if !error.is_retryable() {
            return Err(error);
        }
        let delay = self.backoff.next_delay_ns();
        trace!(code = error.code(), delay_ns = delay, "backing off");
        self.db.shared.clock.sleep_ns(delay);
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.options = TransactionOptions::default();
        self.writes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn printable_escapes_binary() {
        assert_eq!(printable(&[0, 0, 0x2a]), "\\x00\\x00*");
        assert_eq!(printable(b"ab\\"), "ab\\x5c");
    }

    #[test]
    fn commit_of_empty_transaction_is_free() {
        let db = SimDatabase::new(SimStoreConfig::default(), SimClock::new());
        let mut tr = db.create_transaction();
        tr.commit().expect("empty commit");
        assert_eq!(db.stats().commits, 0);
        assert_eq!(db.clock().now_ns(), 0);
    }

    #[test]
    fn committed_data_probe_respects_prefix_boundaries() {
        let mut state = StoreState::new(SimRng::new(0));
        state
            .data
            .insert(TenantId::new(2).data_key(b"key"), Bytes::from_static(b"v"));

        assert!(!state.has_committed_data(&TenantId::new(1).to_prefix()));
        assert!(state.has_committed_data(&TenantId::new(2).to_prefix()));
        assert!(!state.has_committed_data(&TenantId::new(3).to_prefix()));
    }

    #[test]
    fn reset_keeps_backoff_progress() {
        let db = SimDatabase::new(SimStoreConfig::reliable(), SimClock::new());
        let mut tr = db.create_transaction();

        tr.on_error(StoreError::NotCommitted).expect("retryable");
        let after_first = db.clock().now_ns();
        tr.on_error(StoreError::NotCommitted).expect("retryable");
        let after_second = db.clock().now_ns();

        assert_eq!(after_first, 10_000_000);
        assert_eq!(after_second - after_first, 20_000_000);
    }
}
