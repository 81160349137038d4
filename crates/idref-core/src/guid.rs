//! Active Directory `objectGUID` encoding.
//!
//! AD stores GUIDs with the first three fields little-endian ("mixed
//! endian"), which is exactly the `uuid` crate's `*_le` layout.

use uuid::Uuid;

/// Decodes a 16-byte `objectGUID` value.
#[must_use]
pub fn guid_from_ad_bytes(bytes: &[u8]) -> Option<Uuid> {
    Uuid::from_slice_le(bytes).ok()
}

/// Encodes a GUID as the escaped byte string used in `(objectGUID=...)` filters.
#[must_use]
pub fn guid_filter_value(guid: &Uuid) -> String {
    guid.to_bytes_le()
        .iter()
        .map(|b| format!("\\{b:02x}"))
        .collect()
}
