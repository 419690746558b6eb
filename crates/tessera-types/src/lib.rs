//! # tessera-types: Core types for `Tessera`
//!
//! This crate contains shared types used across the `Tessera` workspace:
//! - Tenant identity ([`TenantSlot`], [`TenantId`], [`TenantName`])
//! - Key ranges ([`TENANT_MAP_PREFIX`], [`DATA_WRITE_KEY`], [`DATA_WRITE_VALUE`])
//! - Transaction payloads ([`Mutation`], [`TransactionOption`], [`Knob`])

use std::fmt::{Debug, Display};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

// ============================================================================
// Key Ranges
// ============================================================================

/// Control-plane prefix under which tenant names are created and deleted.
///
/// Setting `TENANT_MAP_PREFIX ++ name` requests creation, clearing it requests
/// deletion, reading it returns the tenant's metadata document.
pub const TENANT_MAP_PREFIX: &[u8] = b"\xff\xff/management/tenant/map/";

/// First byte of every control-plane key. Raw data keys never start with it.
pub const SYSTEM_KEY_BYTE: u8 = 0xff;

/// Key suffix written under a tenant's data prefix.
pub const DATA_WRITE_KEY: &[u8] = b"key";

/// Value written under [`DATA_WRITE_KEY`].
pub const DATA_WRITE_VALUE: &[u8] = b"value";

/// Width of an encoded tenant data prefix in bytes.
pub const TENANT_PREFIX_LEN: usize = 8;

/// Returns true if `key` lies in the control-plane key space.
pub fn is_system_key(key: &[u8]) -> bool {
    key.first() == Some(&SYSTEM_KEY_BYTE)
}

// ============================================================================
// Tenant Identity - All Copy (cheap values)
// ============================================================================

/// Stable index of a logical tenant inside one workload, in `[0, N)`.
///
/// A slot is chosen once per logical tenant and never reused for a different
/// tenant identity within a run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct TenantSlot(u32);

impl TenantSlot {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index as a `usize` for table lookups.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the next slot, wrapping to zero at `capacity`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tessera_types::TenantSlot;
    /// assert_eq!(TenantSlot::new(3).wrapping_next(4), TenantSlot::new(0));
    /// assert_eq!(TenantSlot::new(1).wrapping_next(4), TenantSlot::new(2));
    /// ```
    pub fn wrapping_next(self, capacity: usize) -> Self {
        let next = self.index() + 1;
        if next >= capacity {
            Self(0)
        } else {
            Self(next as u32)
        }
    }
}

impl Display for TenantSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TenantSlot {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<TenantSlot> for u32 {
    fn from(slot: TenantSlot) -> Self {
        slot.0
    }
}

/// Store-assigned tenant identifier.
///
/// Valid identifiers are non-negative. The data range of a tenant is addressed
/// by the 8-byte big-endian encoding of its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(i64);

impl TenantId {
    /// Sentinel used by stores for "no tenant".
    pub const INVALID: TenantId = TenantId(-1);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Encodes the identifier as its data-range prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tessera_types::TenantId;
    /// assert_eq!(TenantId::new(42).to_prefix(), [0, 0, 0, 0, 0, 0, 0, 42]);
    /// ```
    pub fn to_prefix(self) -> [u8; TENANT_PREFIX_LEN] {
        self.0.to_be_bytes()
    }

    /// Decodes the identifier from the first [`TENANT_PREFIX_LEN`] bytes of a
    /// data key. Returns `None` if the key is too short.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tessera_types::TenantId;
    /// let mut key = TenantId::new(7).to_prefix().to_vec();
    /// key.extend_from_slice(b"key");
    /// assert_eq!(TenantId::from_prefix(&key), Some(TenantId::new(7)));
    /// assert_eq!(TenantId::from_prefix(b"short"), None);
    /// ```
    pub fn from_prefix(key: &[u8]) -> Option<Self> {
        let prefix: [u8; TENANT_PREFIX_LEN] = key.get(..TENANT_PREFIX_LEN)?.try_into().ok()?;
        Some(Self(i64::from_be_bytes(prefix)))
    }

    /// Builds `prefix(self) ++ suffix`.
    pub fn data_key(self, suffix: &[u8]) -> Bytes {
        let mut key = BytesMut::with_capacity(TENANT_PREFIX_LEN + suffix.len());
        key.put_slice(&self.to_prefix());
        key.put_slice(suffix);
        key.freeze()
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TenantId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<TenantId> for i64 {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Human-readable tenant name, as written into the control-plane range.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantName(String);

impl TenantName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Deterministic fixed-width name for a slot.
    ///
    /// Names stay six digits wide for slots below 1,000,000; workloads cap
    /// their slot count accordingly.
    ///
    /// # Examples
    ///
    /// ```
    /// # use tessera_types::{TenantName, TenantSlot};
    /// assert_eq!(TenantName::for_slot(TenantSlot::new(42)).as_str(), "tenant_idx_000042");
    /// ```
    pub fn for_slot(slot: TenantSlot) -> Self {
        Self(format!("tenant_idx_{:06}", u32::from(slot)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Control-plane key for this tenant.
    pub fn map_key(&self) -> Bytes {
        let mut key = BytesMut::with_capacity(TENANT_MAP_PREFIX.len() + self.0.len());
        key.put_slice(TENANT_MAP_PREFIX);
        key.put_slice(self.0.as_bytes());
        key.freeze()
    }

    /// Extracts the tenant name from a control-plane key, if it has the
    /// tenant-map prefix and a UTF-8 suffix.
    pub fn from_map_key(key: &[u8]) -> Option<Self> {
        let name = key.strip_prefix(TENANT_MAP_PREFIX)?;
        std::str::from_utf8(name).ok().map(Self::new)
    }
}

impl Debug for TenantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TenantName({:?})", self.0)
    }
}

impl Display for TenantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Transaction Payloads
// ============================================================================

/// A single buffered write inside a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutation {
    /// Set `key` to `value`.
    Set { key: Bytes, value: Bytes },
    /// Remove `key`.
    Clear { key: Bytes },
}

impl Mutation {
    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn clear(key: impl Into<Bytes>) -> Self {
        Self::Clear { key: key.into() }
    }

    pub fn key(&self) -> &Bytes {
        match self {
            Self::Set { key, .. } | Self::Clear { key } => key,
        }
    }

    /// Returns true if this mutation targets the control-plane key space.
    pub fn is_system(&self) -> bool {
        is_system_key(self.key())
    }
}

/// Per-transaction options the workload relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionOption {
    /// Permit writes into the control-plane (special key) range.
    SpecialKeySpaceEnableWrites,
    /// Permit data access addressed by raw tenant prefix rather than by name.
    RawAccess,
}

/// Store configuration knobs a workload may adjust during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Knob {
    /// Upper bound on the number of tenants the cluster will accept.
    MaxTenantsPerCluster(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0, "tenant_idx_000000")]
    #[test_case(7, "tenant_idx_000007")]
    #[test_case(999_999, "tenant_idx_999999")]
    #[test_case(1_000_000, "tenant_idx_1000000"; "wider than six digits")]
    fn tenant_names_are_zero_padded(index: u32, expected: &str) {
        assert_eq!(TenantName::for_slot(TenantSlot::new(index)).as_str(), expected);
    }

    #[test]
    fn map_key_roundtrips_through_name() {
        let name = TenantName::for_slot(TenantSlot::new(12));
        let key = name.map_key();

        assert!(key.starts_with(TENANT_MAP_PREFIX));
        assert!(is_system_key(&key));
        assert_eq!(TenantName::from_map_key(&key), Some(name));
    }

    #[test]
    fn from_map_key_rejects_other_prefixes() {
        assert_eq!(TenantName::from_map_key(b"\xff\xff/management/other"), None);
        assert_eq!(TenantName::from_map_key(b"tenant_idx_000001"), None);
    }

    #[test]
    fn data_keys_are_not_system_keys() {
        let key = TenantId::new(1).data_key(DATA_WRITE_KEY);
        assert_eq!(key.len(), TENANT_PREFIX_LEN + DATA_WRITE_KEY.len());
        assert!(!is_system_key(&key));
    }

    #[test]
    fn invalid_tenant_sentinel() {
        assert!(!TenantId::INVALID.is_valid());
        assert!(TenantId::new(0).is_valid());
    }

    #[test]
    fn wrapping_next_wraps_at_capacity() {
        assert_eq!(TenantSlot::new(0).wrapping_next(1), TenantSlot::new(0));
        assert_eq!(TenantSlot::new(8).wrapping_next(10), TenantSlot::new(9));
        assert_eq!(TenantSlot::new(9).wrapping_next(10), TenantSlot::new(0));
    }

    #[test]
    fn mutation_serializes_to_json() {
        let mutation = Mutation::clear(TenantName::for_slot(TenantSlot::new(3)).map_key());
        let json = serde_json::to_string(&mutation).expect("serialize");
        let back: Mutation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(mutation, back);
        assert!(back.is_system());
    }

    proptest! {
        #[test]
        fn prefix_ordering_matches_identifier_ordering(a in 0..i64::MAX, b in 0..i64::MAX) {
            let pa = TenantId::new(a).to_prefix();
            let pb = TenantId::new(b).to_prefix();
            prop_assert_eq!(a.cmp(&b), pa.cmp(&pb));
        }

        #[test]
        fn prefix_decodes_from_any_data_key(id in 0..i64::MAX, suffix in proptest::collection::vec(any::<u8>(), 0..16)) {
            let key = TenantId::new(id).data_key(&suffix);
            prop_assert_eq!(TenantId::from_prefix(&key), Some(TenantId::new(id)));
        }
    }
}
