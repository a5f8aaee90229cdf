//! Policy document and validation outcome types.
//!
//! A `PolicyDocument` is the `properties`-wrapped envelope every stage of the
//! pipeline agrees on. The normalizer produces one from arbitrary JSON, the
//! guardrail validator classifies it, and the orchestrator decides whether it
//! is delivered.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The placeholder every `policyRule.then.effect` is rewritten to.
///
/// The concrete effect (`Audit`, `Deny`, ...) is deferred to the policy
/// assignment through the `effect` parameter.
pub const EFFECT_TOKEN: &str = "[parameters('effect')]";

/// The only key allowed at the top level of an accepted document.
pub const ENVELOPE_KEY: &str = "properties";

/// Keys that must be present under `properties` once normalized.
pub const REQUIRED_FIELDS: [&str; 4] = ["displayName", "description", "parameters", "policyRule"];

/// A policy envelope: `{"properties": {...}}`.
///
/// The same type carries both not-yet-validated candidates and accepted
/// documents. Whether a document has passed the guardrails is carried by the
/// surrounding `ValidationOutcome`, not by the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(Value);

impl PolicyDocument {
    /// Wrap a `properties` mapping in a fresh envelope.
    pub fn from_properties(properties: Map<String, Value>) -> Self {
        let mut root = Map::new();
        root.insert(ENVELOPE_KEY.to_string(), Value::Object(properties));
        Self(Value::Object(root))
    }

    /// Wrap an already-shaped JSON value without inspecting it.
    ///
    /// Used by tests and by callers re-validating documents they stored
    /// themselves; the validator treats the value as untrusted either way.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// The `properties` mapping, if the envelope has one.
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.0.get(ENVELOPE_KEY).and_then(Value::as_object)
    }

    /// Mutable access to the `properties` mapping.
    pub fn properties_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.0.get_mut(ENVELOPE_KEY).and_then(Value::as_object_mut)
    }

    /// The `properties.policyRule` mapping, if present.
    pub fn policy_rule(&self) -> Option<&Map<String, Value>> {
        self.properties()
            .and_then(|p| p.get("policyRule"))
            .and_then(Value::as_object)
    }

    /// Mutable access to `properties.policyRule`.
    pub fn policy_rule_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.properties_mut()
            .and_then(|p| p.get_mut("policyRule"))
            .and_then(Value::as_object_mut)
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume the document and return the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// The closed set of reasons a candidate can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required envelope field is absent.
    MissingRequiredField,
    /// `policyRule.if` has no conditions.
    EmptyRuleBody,
    /// `policyRule.then` does not reference the effect parameter.
    MalformedEffect,
    /// No JSON object could be recovered from the raw text.
    UnparsableSource,
}

impl ViolationKind {
    /// Stable name used in feedback text and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingRequiredField => "MissingRequiredField",
            ViolationKind::EmptyRuleBody => "EmptyRuleBody",
            ViolationKind::MalformedEffect => "MalformedEffect",
            ViolationKind::UnparsableSource => "UnparsableSource",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one Extract → Normalize → Validate pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Every guardrail passed.
    Valid { document: PolicyDocument },

    /// The first guardrail that failed, with the candidate it failed on.
    Invalid {
        /// Absent only for `UnparsableSource`, where nothing was recovered.
        candidate: Option<PolicyDocument>,
        kind: ViolationKind,
        /// Human-readable description naming the failing path. Embedded
        /// verbatim into retry feedback.
        detail: String,
    },
}

impl ValidationOutcome {
    /// Build an `Invalid` outcome for a candidate that failed a guardrail.
    pub fn invalid(candidate: PolicyDocument, kind: ViolationKind, detail: impl Into<String>) -> Self {
        ValidationOutcome::Invalid {
            candidate: Some(candidate),
            kind,
            detail: detail.into(),
        }
    }

    /// Build an `Invalid` outcome for raw text with no recoverable object.
    pub fn unparsable(detail: impl Into<String>) -> Self {
        ValidationOutcome::Invalid {
            candidate: None,
            kind: ViolationKind::UnparsableSource,
            detail: detail.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid { .. })
    }

    /// The violation kind, or `None` when valid.
    pub fn violation(&self) -> Option<ViolationKind> {
        match self {
            ValidationOutcome::Valid { .. } => None,
            ValidationOutcome::Invalid { kind, .. } => Some(*kind),
        }
    }
}
