//! Workload error types.

use tessera_store::StoreError;
use tessera_types::{TenantId, TenantName, TenantSlot};

use crate::admin::CodecError;

/// Errors that end a workload run.
#[derive(Debug, thiserror::Error)]
pub enum WorkloadError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to decode tenant entry for slot {slot}: {source}")]
    Decode {
        slot: TenantSlot,
        #[source]
        source: CodecError,
    },

    #[error(
        "isolation violation after {tries} tries: illegal access attempted={attempted}, observed={observed}"
    )]
    IsolationViolation {
        attempted: bool,
        observed: bool,
        tries: u32,
    },

    #[error("tenant {name} (slot {slot}) is missing after its creation committed")]
    MissingTenant { slot: TenantSlot, name: TenantName },

    #[error("store handed out tenant id {id} for slot {slot}, but it was already used")]
    IdentifierReused { slot: TenantSlot, id: TenantId },

    #[error("tenant model inconsistent: {0}")]
    ModelInconsistent(String),

    #[error("unknown workload: {0}")]
    UnknownWorkload(String),

    #[error("invalid workload option {key}={value}: {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },

    #[error("check failed: {0}")]
    Check(String),
}

impl WorkloadError {
    /// Returns true if the run cannot continue.
    ///
    /// Only a retryable store error that escaped its retry loop is not fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Store(error) if error.is_retryable())
    }
}
