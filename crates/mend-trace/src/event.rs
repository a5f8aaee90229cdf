//! Trace event and log types.
//!
//! `TraceEvent` wraps one `AttemptRecord` with its position in the chain and
//! the hashes linking it to its predecessor. `TraceLog` is the exported form
//! of a whole request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mend_contracts::repair::AttemptRecord;

/// The `prev_hash` of the first event in every chain: 64 hex zeros.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One link of the hash chain for a single repair request.
///
/// Changing any field, including those of `record`, invalidates
/// `this_hash` and every later `prev_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Position in the chain, starting at 0.
    pub sequence: u64,

    pub request_id: String,

    pub record: AttemptRecord,

    /// `this_hash` of the previous event, or `GENESIS_HASH`.
    pub prev_hash: String,

    /// Lower-case hex SHA-256 over (request_id, sequence, prev_hash, record).
    pub this_hash: String,
}

/// An exported transcript.
///
/// `terminal_hash` is the `this_hash` of the last event (empty when there
/// are none) and commits to the whole log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceLog {
    /// The request the events belong to. Empty if nothing was appended.
    pub request_id: String,

    pub events: Vec<TraceEvent>,

    /// True once the engine reported the request finished.
    pub sealed: bool,

    /// Wall-clock time (UTC) of the export.
    pub exported_at: DateTime<Utc>,

    pub terminal_hash: String,
}
