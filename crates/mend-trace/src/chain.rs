//! Hash-chain primitives: hashing and chain integrity verification.
//!
//! Hash input layout (bytes, in order):
//!   1. request_id as UTF-8 bytes
//!   2. sequence as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. compact JSON of the attempt record

use sha2::{Digest, Sha256};

use mend_contracts::{
    error::{MendError, MendResult},
    repair::AttemptRecord,
};

use crate::event::{TraceEvent, GENESIS_HASH};

/// Compute the SHA-256 hash for a single trace event.
///
/// Returns a lower-case 64-character hex string, or
/// `MendError::TraceWriteFailed` if `record` cannot be serialized.
pub fn hash_event(
    request_id: &str,
    sequence: u64,
    record: &AttemptRecord,
    prev_hash: &str,
) -> MendResult<String> {
    let record_json = serde_json::to_vec(record).map_err(|e| MendError::TraceWriteFailed {
        reason: format!("attempt record is not serializable: {}", e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(request_id.as_bytes());
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());
    hasher.update(&record_json);

    Ok(hex::encode(hasher.finalize()))
}

/// Verify the integrity of a hash chain.
///
/// Returns `true` when every event links to its predecessor (the first to
/// `GENESIS_HASH`), carries the expected sequence number, and stores the hash
/// recomputed from its own fields. An empty chain is valid.
pub fn verify_chain(events: &[TraceEvent]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();

    for (position, event) in events.iter().enumerate() {
        if event.sequence != position as u64 || event.prev_hash != expected_prev {
            return false;
        }

        match hash_event(&event.request_id, event.sequence, &event.record, &event.prev_hash) {
            Ok(recomputed) if recomputed == event.this_hash => {}
            _ => return false,
        }

        expected_prev = event.this_hash.clone();
    }

    true
}
