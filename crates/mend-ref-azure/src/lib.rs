//! # mend-ref-azure
//!
//! Azure Policy reference runtime for the MEND repair pipeline.
//!
//! Wires the real components (JSON extractor, envelope normalizer, guardrail
//! validator, TOML fallback table) into a `RepairEngine` and demonstrates it
//! in four scripted scenarios:
//!
//! 1. **Clean output**: the first answer is accepted after normalization.
//! 2. **Retry fixes**: an empty rule body is repaired by one regeneration.
//! 3. **Heuristic fallback**: the model never fills the rule body; the
//!    default table supplies it.
//! 4. **Rejected**: no regeneration or table entry can help.
//!
//! Model replies are hardcoded. No model server is contacted.

pub mod config;
pub mod scenarios;

use mend_contracts::error::MendResult;
use mend_core::RepairEngine;
use mend_extract::JsonExtractor;
use mend_verify::{EnvelopeNormalizer, GuardrailValidator};

pub use config::{RuntimeConfig, AZURE_DEFAULT_TABLE};

/// Build an engine from a runtime configuration.
///
/// Fails with `MendError::Config` when a table entry is invalid, or
/// `MendError::Schema` when the guardrail schema does not compile.
pub fn build_engine(config: &RuntimeConfig) -> MendResult<RepairEngine> {
    let fallback = config.fallback_table()?;
    let guardrail = GuardrailValidator::new()?;

    Ok(RepairEngine::new(
        Box::new(JsonExtractor::new()),
        Box::new(EnvelopeNormalizer::with_options(config.normalizer.clone())),
        Box::new(guardrail),
        Box::new(fallback),
    ))
}

/// An engine using the embedded Azure default configuration.
pub fn default_engine() -> MendResult<RepairEngine> {
    build_engine(&RuntimeConfig::azure_default()?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
