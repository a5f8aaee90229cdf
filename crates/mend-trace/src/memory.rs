//! In-memory implementation of `TraceSink`.
//!
//! `InMemoryTrace` records the attempts of one repair request. The request
//! id is learned from the first append; records of any other request are
//! refused, as is anything appended after `seal()`. Cloning the trace shares
//! the underlying chain, so a caller can keep a handle while lending the
//! other to the engine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use mend_contracts::{
    error::{MendError, MendResult},
    repair::AttemptRecord,
};
use mend_core::traits::TraceSink;

use crate::{
    chain::{hash_event, verify_chain},
    event::{TraceEvent, TraceLog, GENESIS_HASH},
};

// ── Internal mutable state ────────────────────────────────────────────────────

pub(crate) struct TraceState {
    /// Bound on the first append or seal.
    pub(crate) request_id: Option<String>,

    pub(crate) events: Vec<TraceEvent>,

    /// `this_hash` of the last event, or `GENESIS_HASH` before any.
    pub(crate) last_hash: String,

    pub(crate) sealed: bool,
}

impl TraceState {
    /// Bind to `request_id`, or check that it is the one already bound.
    fn claim(&mut self, request_id: &str) -> MendResult<()> {
        match &self.request_id {
            Some(bound) if bound != request_id => Err(MendError::TraceWriteFailed {
                reason: format!(
                    "trace belongs to request '{}', refusing record of request '{}'",
                    bound, request_id
                ),
            }),
            Some(_) => Ok(()),
            None => {
                self.request_id = Some(request_id.to_string());
                Ok(())
            }
        }
    }
}

// ── Public trace ──────────────────────────────────────────────────────────────

/// An append-only attempt transcript backed by a SHA-256 hash chain.
#[derive(Clone)]
pub struct InMemoryTrace {
    pub(crate) state: Arc<Mutex<TraceState>>,
}

impl InMemoryTrace {
    pub fn new() -> Self {
        let state = TraceState {
            request_id: None,
            events: Vec::new(),
            last_hash: GENESIS_HASH.to_string(),
            sealed: false,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Readers see the chain even if a writer panicked.
    fn read(&self) -> MutexGuard<'_, TraceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> MendResult<MutexGuard<'_, TraceState>> {
        self.state.lock().map_err(|e| MendError::TraceWriteFailed {
            reason: format!("trace state lock poisoned: {}", e),
        })
    }

    /// The request this trace is bound to, if any record has arrived.
    pub fn request_id(&self) -> Option<String> {
        self.read().request_id.clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.read().sealed
    }

    /// Export every event appended so far.
    pub fn export(&self) -> TraceLog {
        let state = self.read();
        let terminal_hash = state
            .events
            .last()
            .map(|e| e.this_hash.clone())
            .unwrap_or_default();

        TraceLog {
            request_id: state.request_id.clone().unwrap_or_default(),
            events: state.events.clone(),
            sealed: state.sealed,
            exported_at: Utc::now(),
            terminal_hash,
        }
    }

    /// Recompute the chain and report whether it is intact.
    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.read().events)
    }
}

impl Default for InMemoryTrace {
    fn default() -> Self {
        Self::new()
    }
}

// ── TraceSink impl ────────────────────────────────────────────────────────────

impl TraceSink for InMemoryTrace {
    fn append(&self, request_id: &str, record: &AttemptRecord) -> MendResult<()> {
        let mut state = self.write()?;
        if state.sealed {
            return Err(MendError::TraceWriteFailed {
                reason: format!("trace of request '{}' is sealed", request_id),
            });
        }
        state.claim(request_id)?;

        let prev_hash = state.last_hash.clone();
        let sequence = state.events.len() as u64;
        let this_hash = hash_event(request_id, sequence, record, &prev_hash)?;

        debug!(request_id = %request_id, sequence, stage = ?record.stage, "trace event appended");
        state.events.push(TraceEvent {
            sequence,
            request_id: request_id.to_string(),
            record: record.clone(),
            prev_hash,
            this_hash: this_hash.clone(),
        });
        state.last_hash = this_hash;

        Ok(())
    }

    fn seal(&self, request_id: &str) -> MendResult<()> {
        let mut state = self.write()?;
        state.claim(request_id)?;
        state.sealed = true;

        info!(
            request_id = %request_id,
            event_count = state.events.len(),
            terminal_hash = %state.last_hash,
            "trace sealed"
        );

        Ok(())
    }
}
