//! Isolation oracle for raw tenant access.
//!
//! Across all tries of one attempt the oracle keeps two sticky flags: whether
//! any build planned an illegal write, and whether any try failed with an
//! illegal tenant access error. When the attempt finally commits the flags
//! must agree. A committed attempt that planned an illegal write but never
//! saw it rejected means the store leaked access; one that saw a rejection
//! without planning an illegal write means the store rejected a valid write.

use tessera_store::StoreError;
use tracing::error;

use crate::error::WorkloadError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IllegalAccessOracle {
    attempted: bool,
    observed: bool,
    rejections: u32,
}

impl IllegalAccessOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records whether a build planned an illegal write.
    pub fn record_plan(&mut self, illegal_attempted: bool) {
        self.attempted |= illegal_attempted;
    }

    /// Records a failed try.
    pub fn record_error(&mut self, error: &StoreError) {
        if error.is_illegal_tenant_access() {
            self.observed = true;
            self.rejections += 1;
        }
    }

    pub fn attempted(&self) -> bool {
        self.attempted
    }

    pub fn observed(&self) -> bool {
        self.observed
    }

    /// Illegal tenant access errors seen across all tries.
    pub fn rejections(&self) -> u32 {
        self.rejections
    }

    /// Checks the flags once the attempt has committed after `tries` tries.
    pub fn verify_commit(&self, tries: u32) -> Result<(), WorkloadError> {
        if self.attempted == self.observed {
            return Ok(());
        }
        error!(
            attempted = self.attempted,
            observed = self.observed,
            tries,
            "raw tenant access isolation violated"
        );
        Err(WorkloadError::IsolationViolation {
            attempted: self.attempted,
            observed: self.observed,
            tries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_types::TenantId;

    #[test]
    fn clean_attempt_passes() {
        let oracle = IllegalAccessOracle::new();
        assert!(oracle.verify_commit(1).is_ok());
    }

    #[test]
    fn caught_illegal_write_passes() {
        let mut oracle = IllegalAccessOracle::new();
        oracle.record_plan(true);
        oracle.record_error(&StoreError::IllegalTenantAccess(TenantId::new(999_999)));
        oracle.record_plan(false);

        assert!(oracle.attempted());
        assert!(oracle.observed());
        assert!(oracle.verify_commit(2).is_ok());
    }

    #[test]
    fn leaked_illegal_write_is_a_violation() {
        let mut oracle = IllegalAccessOracle::new();
        oracle.record_plan(true);
        oracle.record_error(&StoreError::NotCommitted);

        assert!(matches!(
            oracle.verify_commit(2),
            Err(WorkloadError::IsolationViolation {
                attempted: true,
                observed: false,
                tries: 2,
            })
        ));
    }

    #[test]
    fn spurious_rejection_is_a_violation() {
        let mut oracle = IllegalAccessOracle::new();
        oracle.record_plan(false);
        oracle.record_error(&StoreError::IllegalTenantAccess(TenantId::new(3)));

        assert!(oracle.verify_commit(2).is_err());
        assert_eq!(oracle.rejections(), 1);
    }
}
