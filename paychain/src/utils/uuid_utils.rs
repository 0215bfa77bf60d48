//! Identifier generation.

use uuid::Uuid;

/// Prefix of every gateway-assigned transaction identifier.
pub const TRANSACTION_ID_PREFIX: &str = "txn_";

/// Generates an opaque transaction identifier.
///
/// Uses a time-ordered UUID v7 so identifiers sort roughly by creation.
#[must_use]
pub fn generate_transaction_id() -> String {
    format!("{TRANSACTION_ID_PREFIX}{}", Uuid::now_v7().simple())
}
