//! Hash-chain primitives: entry hashing and the genesis sentinel.
//!
//! Every field that contributes to an entry's hash is listed explicitly so
//! nothing is accidentally omitted. Each field is length-prefixed so that
//! moving bytes between adjacent fields changes the digest.
//!
//! Hash input layout (in order):
//!   1. id as 8-byte little-endian
//!   2. timestamp as RFC 3339 with microseconds and a `Z` suffix
//!   3. actor_id (optional i64)
//!   4. action
//!   5. resource_type
//!   6. resource_id (optional)
//!   7. status (`success` | `error`)
//!   8. error_message (optional)
//!   9. compact JSON of metadata (object keys sorted)
//!  10. previous_hash, or `GENESIS_HASH` for the first entry
//!
//! Optional fields are written as a presence byte followed by the value.

use chrono::SecondsFormat;
use sha2::{Digest, Sha256};

use sentinel_contracts::ledger::LedgerEntry;

/// The value hashed in place of `previous_hash` for the genesis entry.
///
/// 64 hex zeros, a value that is never the SHA-256 of real data.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Compute the SHA-256 hash of `entry` from its own fields.
///
/// The stored `entry_hash` is ignored; everything else, including
/// `previous_hash`, is committed to. Returns a lowercase 64-character hex
/// string.
pub fn compute_entry_hash(entry: &LedgerEntry) -> String {
    let mut hasher = Sha256::new();

    hasher.update(entry.id.to_le_bytes());
    update_str(
        &mut hasher,
        &entry
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Micros, true),
    );

    match entry.actor_id {
        Some(actor) => {
            hasher.update([1u8]);
            hasher.update(actor.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }

    update_str(&mut hasher, &entry.action);
    update_str(&mut hasher, &entry.resource_type);
    update_opt_str(&mut hasher, entry.resource_id.as_deref());
    update_str(&mut hasher, entry.status.as_str());
    update_opt_str(&mut hasher, entry.error_message.as_deref());
    // `Value`'s Display is compact JSON; object keys come out sorted.
    update_str(&mut hasher, &entry.metadata.to_string());
    update_str(
        &mut hasher,
        entry.previous_hash.as_deref().unwrap_or(GENESIS_HASH),
    );

    hex::encode(hasher.finalize())
}

fn update_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn update_opt_str(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            update_str(hasher, v);
        }
        None => hasher.update([0u8]),
    }
}
