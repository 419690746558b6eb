//! Canary mutations for testing the isolation oracle.
//!
//! This module contains intentional isolation bugs in the reference store.
//! Each canary is gated by a feature flag and should never be enabled outside
//! of oracle self-tests. A run with a canary enabled **must** fail with an
//! isolation violation; if it passes, the oracle is too weak.
//!
//! # Available Canaries
//!
//! - `canary-deleted-tenant-leak`: accept raw writes to a tenant deleted
//!   earlier in the same transaction
//! - `canary-spurious-illegal-access`: occasionally reject a valid raw write
//!
//! # Usage
//!
//! ```bash
//! cargo test -p tessera-workload --features canary-deleted-tenant-leak
//! ```

use crate::rng::SimRng;

/// Canary: leak access to tenants deleted in the same transaction.
///
/// **Expected Detection**: `IllegalAccessOracle`
/// **Why it fails**: the attempt plans an illegal write but the commit
/// succeeds without ever reporting illegal tenant access.
#[cfg(feature = "canary-deleted-tenant-leak")]
pub fn leak_deleted_tenant(deleted_in_transaction: bool) -> bool {
    deleted_in_transaction
}

#[cfg(not(feature = "canary-deleted-tenant-leak"))]
#[allow(unused_variables)]
pub fn leak_deleted_tenant(deleted_in_transaction: bool) -> bool {
    false
}

/// Canary: reject a valid raw write 2% of the time.
///
/// **Expected Detection**: `IllegalAccessOracle`
/// **Why it fails**: an attempt without illegal writes observes an illegal
/// access error and later commits.
#[cfg(feature = "canary-spurious-illegal-access")]
pub fn spurious_illegal_access(rng: &mut SimRng) -> bool {
    rng.next_bool_with_probability(0.02)
}

#[cfg(not(feature = "canary-spurious-illegal-access"))]
#[allow(unused_variables)]
pub fn spurious_illegal_access(rng: &mut SimRng) -> bool {
    false
}
