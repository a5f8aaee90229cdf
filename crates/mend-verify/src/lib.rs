//! # mend-verify
//!
//! Candidate shaping and checking for the MEND pipeline.
//!
//! - [`normalizer::EnvelopeNormalizer`] reshapes whatever JSON the model
//!   produced into a `properties` envelope and collapses literal effects to
//!   the effect token ([`mend_core::traits::Normalizer`]).
//! - [`guardrail::GuardrailValidator`] checks a candidate in three phases
//!   ([`mend_core::traits::Guardrail`]):
//!
//!   1. **Structural**: JSON Schema validation via the `jsonschema` crate.
//!   2. **Rule body**: `policyRule.if` must not be empty.
//!   3. **Effect**: `policyRule.then.effect` must be `[parameters('effect')]`.
//!
//! - [`scorecard::score`] grades a finished document offline, and
//!   [`scorecard::score_text`] grades raw text.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use mend_verify::{EnvelopeNormalizer, GuardrailValidator};
//!
//! let doc = EnvelopeNormalizer::new().normalize(value);
//! let outcome = GuardrailValidator::new()?.validate(&doc);
//! ```

pub mod guardrail;
pub mod normalizer;
pub mod scorecard;

pub use guardrail::GuardrailValidator;
pub use normalizer::{EnvelopeNormalizer, NormalizerOptions};
pub use scorecard::{score, score_text, ScoreIssue, Scorecard};
