//! # mend-core
//!
//! The repair pipeline for MEND: model text in, validated policy document (or
//! a typed rejection) out.
//!
//! This crate provides:
//! - The component traits (`Extractor`, `Normalizer`, `Guardrail`,
//!   `FallbackPolicy`, `Generator`, `TraceSink`)
//! - The `RepairEngine` that runs them as a bounded retry/fallback state machine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mend_core::{RepairEngine, traits::Generator};
//!
//! let report = engine.repair(&raw, "Require secure transfer for storage accounts", &generator);
//! ```

pub mod engine;
pub mod traits;

pub use engine::{feedback_for, RepairEngine};
