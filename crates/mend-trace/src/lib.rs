//! # mend-trace
//!
//! Append-only, SHA-256 hash-chained transcripts of repair requests.
//!
//! ## Overview
//!
//! Every attempt the repair engine makes is wrapped in a `TraceEvent` that
//! links to the previous event via its SHA-256 hash. Editing any recorded
//! attempt, even the raw model text, breaks the chain and is detected by
//! `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mend_trace::InMemoryTrace;
//!
//! let trace = InMemoryTrace::new();
//! let report = engine.repair_traced(&raw, instruction, &generator, &trace);
//!
//! assert!(trace.verify_integrity());
//! let log = trace.export();
//! ```

pub mod chain;
pub mod event;
pub mod memory;

pub use chain::{hash_event, verify_chain};
pub use event::{TraceEvent, TraceLog, GENESIS_HASH};
pub use memory::InMemoryTrace;

// ── Tests ─────────────────────────────────────────────────────────────────────
