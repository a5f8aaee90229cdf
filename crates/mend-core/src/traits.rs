//! Component trait definitions for the MEND repair pipeline.
//!
//! The pipeline is split at the same seams the data flows through:
//!
//! - `Extractor`     : raw text → JSON value
//! - `Normalizer`    : JSON value → policy envelope (total, never fails)
//! - `Guardrail`     : envelope → `ValidationOutcome`
//! - `FallbackPolicy`: instruction → canned rule body, if one is known
//! - `Generator`     : feedback → new raw text (the only call that may block)
//! - `TraceSink`     : optional per-request attempt recorder
//!
//! `RepairEngine` owns the first four and borrows the last two per request.

use serde_json::Value;

use mend_contracts::{
    document::{PolicyDocument, ValidationOutcome},
    error::{ExtractionError, GenerationError, MendResult},
    repair::{AttemptRecord, FallbackMatch},
};

/// Recovers a JSON value from text that may be wrapped in prose or fences.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &str) -> Result<Value, ExtractionError>;
}

/// Reshapes arbitrary JSON into a policy envelope.
///
/// Implementations must be total: every input, including arrays and scalars,
/// yields a candidate. Semantic correctness is left to the `Guardrail`.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, value: Value) -> PolicyDocument;
}

/// Classifies a normalized candidate.
///
/// Implementations short-circuit at the first violation and describe the
/// failing path in the outcome's `detail`.
pub trait Guardrail: Send + Sync {
    fn validate(&self, document: &PolicyDocument) -> ValidationOutcome;
}

/// Immutable lookup from instruction text to a hand-authored rule body.
pub trait FallbackPolicy: Send + Sync {
    /// Return the first entry whose keywords match `instruction`, if any.
    fn canned_clause(&self, instruction: &str) -> Option<FallbackMatch>;
}

/// The external text generator, typically an HTTP call to a model server.
///
/// The engine calls this at most once per request. Timeouts and transport
/// failures are the implementation's business and should come back as
/// `GenerationError`; the engine treats any error as unparsable output.
pub trait Generator {
    fn generate(&self, feedback: &str) -> Result<String, GenerationError>;
}

impl<F> Generator for F
where
    F: Fn(&str) -> Result<String, GenerationError>,
{
    fn generate(&self, feedback: &str) -> Result<String, GenerationError> {
        self(feedback)
    }
}

/// Receives the attempts of a single repair request as they happen.
pub trait TraceSink {
    /// Append one attempt record of request `request_id`. Implementations
    /// must treat this as append-only.
    fn append(&self, request_id: &str, record: &AttemptRecord) -> MendResult<()>;

    /// Called once when the request reaches a terminal state.
    fn seal(&self, request_id: &str) -> MendResult<()>;
}
