//! Guardrail validator for normalized policy envelopes.
//!
//! `GuardrailValidator` implements the `Guardrail` trait from `mend-core`.
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. **Structural**: the envelope is validated against a compiled JSON
//!    Schema requiring `properties.{displayName, description, parameters,
//!    policyRule}` and `policyRule.{if, then}`. The two text fields must be
//!    strings and `parameters` a mapping.
//! 2. **Rule body**: `policyRule.if` must carry at least one condition.
//! 3. **Effect**: `policyRule.then.effect` must be the effect token.
//!
//! The failure detail names the path that failed; the orchestrator copies it
//! verbatim into the retry feedback.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use mend_contracts::{
    document::{PolicyDocument, ValidationOutcome, ViolationKind, EFFECT_TOKEN},
    error::{MendError, MendResult},
};
use mend_core::traits::Guardrail;

/// Operators whose operand list must not be empty.
const LOGICAL_OPERATORS: [&str; 2] = ["allOf", "anyOf"];

/// The JSON Schema every candidate must satisfy before semantic checks run.
pub fn envelope_schema() -> Value {
    json!({
        "type": "object",
        "required": ["properties"],
        "properties": {
            "properties": {
                "type": "object",
                "required": ["displayName", "description", "parameters", "policyRule"],
                "properties": {
                    "displayName": { "type": "string" },
                    "description": { "type": "string" },
                    "parameters": { "type": "object" },
                    "policyRule": {
                        "type": "object",
                        "required": ["if", "then"]
                    }
                }
            }
        }
    })
}

/// The policy guardrails.
pub struct GuardrailValidator {
    envelope: jsonschema::Validator,
}

impl GuardrailValidator {
    /// Compile the envelope schema.
    ///
    /// Returns `MendError::Schema` if the built-in schema does not compile.
    pub fn new() -> MendResult<Self> {
        let envelope = jsonschema::validator_for(&envelope_schema()).map_err(|e| MendError::Schema {
            reason: format!("envelope schema does not compile: {e}"),
        })?;
        Ok(Self { envelope })
    }

    /// First structural violation, formatted with its instance path.
    fn structural_violation(&self, value: &Value) -> Option<String> {
        let error = self.envelope.iter_errors(value).next()?;
        let path = error.instance_path.to_string();
        let path = if path.is_empty() { "/" } else { path.as_str() };
        Some(format!("envelope field missing or mistyped at {path}: {error}"))
    }
}

/// Describe why `policyRule.if` is empty, or `None` if it has a condition.
fn empty_rule_body(condition: Option<&Value>) -> Option<String> {
    match condition {
        None => Some("properties.policyRule.if is missing".to_string()),
        Some(Value::Null) => Some("properties.policyRule.if is null".to_string()),
        Some(Value::Object(map)) if map.is_empty() => {
            Some("properties.policyRule.if is an empty mapping".to_string())
        }
        Some(Value::Object(map)) => empty_operator(map),
        Some(Value::Array(items)) if items.is_empty() => {
            Some("properties.policyRule.if is an empty list".to_string())
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            Some("properties.policyRule.if is an empty string".to_string())
        }
        Some(_) => None,
    }
}

fn empty_operator(condition: &Map<String, Value>) -> Option<String> {
    LOGICAL_OPERATORS.iter().find_map(|op| match condition.get(*op) {
        Some(Value::Array(operands)) if operands.is_empty() => Some(format!(
            "properties.policyRule.if.{op} is an empty operand list"
        )),
        _ => None,
    })
}

/// Describe why `policyRule.then` does not reference the effect parameter.
fn malformed_effect(then: Option<&Value>) -> Option<String> {
    match then {
        None => Some("properties.policyRule.then is missing".to_string()),
        Some(Value::Object(then)) => match then.get("effect") {
            None => Some("properties.policyRule.then.effect is missing".to_string()),
            Some(effect) if effect.as_str() == Some(EFFECT_TOKEN) => None,
            Some(effect) => Some(format!(
                "properties.policyRule.then.effect is {effect}, expected \"{EFFECT_TOKEN}\""
            )),
        },
        Some(other) => Some(format!(
            "properties.policyRule.then must be a mapping, found {other}"
        )),
    }
}

impl Guardrail for GuardrailValidator {
    fn validate(&self, document: &PolicyDocument) -> ValidationOutcome {
        let fail = |kind: ViolationKind, detail: String| {
            warn!(kind = %kind, %detail, "guardrail failed");
            ValidationOutcome::invalid(document.clone(), kind, detail)
        };

        // ── 1. Structural ─────────────────────────────────────────────────────
        if let Some(detail) = self.structural_violation(document.as_value()) {
            return fail(ViolationKind::MissingRequiredField, detail);
        }
        let Some(rule) = document.policy_rule() else {
            return fail(
                ViolationKind::MissingRequiredField,
                "properties.policyRule is missing".to_string(),
            );
        };

        // ── 2. Rule body ──────────────────────────────────────────────────────
        if let Some(detail) = empty_rule_body(rule.get("if")) {
            return fail(ViolationKind::EmptyRuleBody, detail);
        }

        // ── 3. Effect ─────────────────────────────────────────────────────────
        if let Some(detail) = malformed_effect(rule.get("then")) {
            return fail(ViolationKind::MalformedEffect, detail);
        }

        debug!("all guardrails passed");
        ValidationOutcome::Valid { document: document.clone() }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
