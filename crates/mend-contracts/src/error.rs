//! Error types for the MEND pipeline.
//!
//! Semantic failures of model output are never errors: they travel as
//! `ValidationOutcome` / `RepairOutcome` values. The types here cover the
//! lexical stage, the injected generator, and infrastructure (configuration,
//! schema compilation, trace sinks).

use thiserror::Error;

/// Why no JSON object could be recovered from raw text.
///
/// Both variants surface to callers as `ViolationKind::UnparsableSource`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    /// The text contains no balanced `{ ... }` span at all.
    #[error("no balanced JSON object found in {len} bytes of text")]
    NoBalancedObject { len: usize },

    /// Balanced spans exist but none of them is valid JSON.
    #[error("candidate object at byte {offset} is not valid JSON: {reason}")]
    InvalidJson { offset: usize, reason: String },
}

/// Failure reported by an injected `Generator`.
///
/// The orchestrator treats every variant as an unparsable regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The generator has nothing to offer (no model loaded, no replay file).
    #[error("generator unavailable: {reason}")]
    Unavailable { reason: String },

    /// The generator gave up waiting on the model endpoint.
    #[error("generation timed out after {seconds}s")]
    TimedOut { seconds: u64 },

    #[error("generation failed: {reason}")]
    Failed { reason: String },
}

/// The workspace-wide infrastructure error.
#[derive(Debug, Error)]
pub enum MendError {
    /// A configuration document is missing, malformed or inconsistent.
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The built-in envelope schema could not be compiled.
    #[error("schema compilation error: {reason}")]
    Schema { reason: String },

    /// A trace sink could not append an attempt record.
    #[error("trace write failed: {reason}")]
    TraceWriteFailed { reason: String },

    #[error("i/o error on '{path}': {reason}")]
    Io { path: String, reason: String },
}

/// Convenience alias used throughout the MEND crates.
pub type MendResult<T> = Result<T, MendError>;
