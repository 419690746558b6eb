//! Encoding of control-plane and data-range operations.
//!
//! Tenants are created by setting their tenant-map key, deleted by clearing
//! it, and described by the JSON document the store returns when the key is
//! read. Data writes are addressed by the raw identifier prefix.

use bytes::Bytes;
use serde_json::Value;
use tessera_types::{DATA_WRITE_KEY, DATA_WRITE_VALUE, Mutation, TenantId, TenantName, TenantSlot};

/// Errors decoding a tenant-map entry.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("tenant entry is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tenant entry is not a JSON object")]
    NotObject,

    #[error("tenant entry has no `id` field")]
    MissingId,

    #[error("tenant entry `id` is not a 64-bit integer: {0}")]
    NotInteger(String),

    #[error("tenant entry `id` {0} is negative")]
    Negative(i64),
}

pub fn tenant_name(slot: TenantSlot) -> TenantName {
    TenantName::for_slot(slot)
}

pub fn tenant_map_key(slot: TenantSlot) -> Bytes {
    tenant_name(slot).map_key()
}

/// Requests creation of the slot's tenant.
pub fn encode_create(slot: TenantSlot) -> Mutation {
    Mutation::set(tenant_map_key(slot), Bytes::new())
}

/// Requests deletion of the slot's tenant.
pub fn encode_delete(slot: TenantSlot) -> Mutation {
    Mutation::clear(tenant_map_key(slot))
}

pub fn encode_data_write(id: TenantId) -> Mutation {
    Mutation::set(id.data_key(DATA_WRITE_KEY), Bytes::from_static(DATA_WRITE_VALUE))
}

pub fn encode_data_clear(id: TenantId) -> Mutation {
    Mutation::clear(id.data_key(DATA_WRITE_KEY))
}

/// Extracts the store-assigned identifier from a tenant-map entry.
///
/// # Examples
///
/// ```
/// # use tessera_workload::admin::decode_assigned_identifier;
/// let id = decode_assigned_identifier(br#"{"id":42,"prefix":"\\x00"}"#).unwrap();
/// assert_eq!(id.get(), 42);
/// ```
pub fn decode_assigned_identifier(raw: &[u8]) -> Result<TenantId, CodecError> {
    let entry: Value = serde_json::from_slice(raw)?;
    let object = entry.as_object().ok_or(CodecError::NotObject)?;
    let id = object.get("id").ok_or(CodecError::MissingId)?;
    let id = id
        .as_i64()
        .ok_or_else(|| CodecError::NotInteger(id.to_string()))?;
    if id < 0 {
        return Err(CodecError::Negative(id));
    }
    Ok(TenantId::new(id))
}
