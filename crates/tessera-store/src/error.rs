//! Store error taxonomy.
//!
//! Every error carries a stable numeric code and a retryability class. The
//! retry loop inspects the kind to decide between backing off and failing.

use tessera_types::{TenantId, TenantName};

/// Errors returned by store round-trips.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    // Retryable
    #[error("transaction not committed due to conflict with another transaction")]
    NotCommitted,

    #[error("transaction is too old to perform reads or be committed")]
    TransactionTooOld,

    #[error("transaction may or may not have committed")]
    CommitUnknownResult,

    #[error("cluster has no capacity for tenant {name}: limit of {limit} tenants reached")]
    ClusterNoCapacity { name: TenantName, limit: usize },

    #[error("illegal access to tenant data range for tenant id {0}")]
    IllegalTenantAccess(TenantId),

    // Non-retryable
    #[error("special key space writes are disabled for this transaction")]
    SpecialKeysWriteDisabled,

    #[error("raw data access requires the raw access option")]
    RawAccessRequired,

    #[error("cannot delete tenant {0}: its data range is not empty")]
    TenantNotEmpty(TenantName),

    #[error("key is not in a writable special key range")]
    InvalidSpecialKey,

    #[error("internal store error: {0}")]
    Internal(String),
}

impl StoreError {
    /// Stable numeric code, for logs and cross-process comparison.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotCommitted => 1020,
            Self::TransactionTooOld => 1007,
            Self::CommitUnknownResult => 1021,
            Self::ClusterNoCapacity { .. } => 2166,
            Self::IllegalTenantAccess(_) => 2138,
            Self::SpecialKeysWriteDisabled => 2114,
            Self::RawAccessRequired => 2130,
            Self::TenantNotEmpty(_) => 2133,
            Self::InvalidSpecialKey => 2116,
            Self::Internal(_) => 4100,
        }
    }

    /// Returns true if the standard retry policy applies to this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NotCommitted
                | Self::TransactionTooOld
                | Self::CommitUnknownResult
                | Self::ClusterNoCapacity { .. }
                | Self::IllegalTenantAccess(_)
        )
    }

    /// Returns true if the commit may have been applied despite the error.
    pub fn maybe_committed(&self) -> bool {
        matches!(self, Self::CommitUnknownResult)
    }

    pub fn is_illegal_tenant_access(&self) -> bool {
        matches!(self, Self::IllegalTenantAccess(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(StoreError::NotCommitted, true)]
    #[test_case(StoreError::TransactionTooOld, true)]
    #[test_case(StoreError::CommitUnknownResult, true)]
    #[test_case(StoreError::ClusterNoCapacity { name: TenantName::new("t"), limit: 20 }, true)]
    #[test_case(StoreError::IllegalTenantAccess(TenantId::new(9)), true)]
    #[test_case(StoreError::SpecialKeysWriteDisabled, false)]
    #[test_case(StoreError::RawAccessRequired, false)]
    #[test_case(StoreError::TenantNotEmpty(TenantName::new("t")), false)]
    #[test_case(StoreError::InvalidSpecialKey, false)]
    #[test_case(StoreError::Internal("boom".into()), false)]
    fn retryability(error: StoreError, retryable: bool) {
        assert_eq!(error.is_retryable(), retryable);
    }

    #[test]
    fn codes_are_distinct() {
        let errors = [
            StoreError::NotCommitted,
            StoreError::TransactionTooOld,
            StoreError::CommitUnknownResult,
            StoreError::ClusterNoCapacity {
                name: TenantName::new("t"),
                limit: 1,
            },
            StoreError::IllegalTenantAccess(TenantId::new(1)),
            StoreError::SpecialKeysWriteDisabled,
            StoreError::RawAccessRequired,
            StoreError::TenantNotEmpty(TenantName::new("t")),
            StoreError::InvalidSpecialKey,
            StoreError::Internal(String::new()),
        ];
        let mut codes: Vec<u16> = errors.iter().map(StoreError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn only_unknown_result_may_have_committed() {
        assert!(StoreError::CommitUnknownResult.maybe_committed());
        assert!(!StoreError::NotCommitted.maybe_committed());
    }
}
