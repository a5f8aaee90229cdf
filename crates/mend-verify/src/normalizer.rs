//! Envelope normalizer.
//!
//! `EnvelopeNormalizer` implements the `Normalizer` trait from `mend-core`.
//! It is total: arrays, scalars and unrelated mappings all come out as a
//! `{"properties": {...}}` envelope carrying the four required fields.
//! Rules, in order:
//!
//! 1. An existing `properties` mapping is kept alone; sibling root keys go.
//! 2. A root that looks like the interior (`policyRule` or `displayName`) is
//!    wrapped; a bare `{if, then}` rule body becomes `policyRule`.
//! 3. `displayName` / `description` default to `""`. A value of another
//!    type is kept for the guardrail to reject.
//! 4. `parameters` defaults to `{}`.
//! 5. `policyRule` defaults to `{"if": {"allOf": []}, "then": {}}`, which the
//!    guardrail rejects as an empty rule body.
//! 6. `policyRule.then.effect`, whatever its value, becomes the effect token.
//! 7. The `effect` parameter is declared when the rule references it.
//!
//! Applying the normalizer twice gives the same document as applying it once.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use mend_contracts::document::{PolicyDocument, EFFECT_TOKEN, ENVELOPE_KEY};
use mend_core::traits::Normalizer;

/// Tunables for the effect parameter declaration (rule 7).
///
/// Deserializable from the `[normalizer]` table of a runtime config file:
///
/// ```toml
/// [normalizer]
/// declare_effect_parameter = true
/// default_effect = "Audit"
/// allowed_effects = ["Audit", "Deny", "Disabled"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerOptions {
    /// Declare `parameters.effect` when `then.effect` references it.
    pub declare_effect_parameter: bool,
    /// `defaultValue` used when the model named no recognised effect.
    pub default_effect: String,
    /// `allowedValues` of the declared parameter, in canonical case.
    pub allowed_effects: Vec<String>,
}

impl Default for NormalizerOptions {
    fn default() -> Self {
        Self {
            declare_effect_parameter: true,
            default_effect: "Audit".to_string(),
            allowed_effects: vec!["Audit".to_string(), "Deny".to_string(), "Disabled".to_string()],
        }
    }
}

/// Reshapes arbitrary JSON into a policy envelope.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeNormalizer {
    options: NormalizerOptions,
}

impl EnvelopeNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: NormalizerOptions) -> Self {
        Self { options }
    }

    /// Build the `parameters.effect` declaration.
    ///
    /// The model's own effect name becomes the default when it is one of the
    /// allowed values; the `then` clause itself never keeps it.
    fn effect_parameter(&self, original: Option<&Value>) -> Value {
        let default = original
            .and_then(Value::as_str)
            .and_then(|name| {
                self.options
                    .allowed_effects
                    .iter()
                    .find(|allowed| allowed.eq_ignore_ascii_case(name.trim()))
            })
            .unwrap_or(&self.options.default_effect);

        json!({
            "type": "String",
            "metadata": {
                "displayName": "Effect",
                "description": "Enable or disable the execution of the policy"
            },
            "allowedValues": self.options.allowed_effects,
            "defaultValue": default
        })
    }
}

/// Rules 1 and 2: find or synthesize the `properties` mapping.
fn envelope_interior(value: Value) -> Map<String, Value> {
    let mut root = match value {
        Value::Object(root) => root,
        other => {
            debug!(kind = json_kind(&other), "non-object input, starting from an empty envelope");
            return Map::new();
        }
    };

    match root.remove(ENVELOPE_KEY) {
        Some(Value::Object(properties)) => {
            if !root.is_empty() {
                let dropped: Vec<&str> = root.keys().map(String::as_str).collect();
                debug!(?dropped, "dropping root keys outside properties");
            }
            return properties;
        }
        Some(other) => {
            debug!(kind = json_kind(&other), "ignoring non-object properties value");
        }
        None => {}
    }

    if root.contains_key("policyRule") || root.contains_key("displayName") {
        return root;
    }

    if root.contains_key("if") && root.contains_key("then") {
        let mut properties = Map::new();
        properties.insert("policyRule".to_string(), Value::Object(root));
        return properties;
    }

    debug!(keys = root.len(), "input does not resemble a policy, starting from an empty envelope");
    Map::new()
}

/// Rule 3: absent or null text fields become empty strings.
fn ensure_text(properties: &mut Map<String, Value>, key: &str) {
    if matches!(properties.get(key), None | Some(Value::Null)) {
        properties.insert(key.to_string(), Value::String(String::new()));
    }
}

/// Rule 5: make sure `policyRule` is a mapping with `if` and `then`.
fn ensure_policy_rule(properties: &mut Map<String, Value>) {
    match properties.get("policyRule") {
        Some(Value::Object(_)) => {}
        Some(other) => {
            debug!(kind = json_kind(other), "replacing non-object policyRule with an empty shell");
            properties.insert("policyRule".to_string(), Value::Object(Map::new()));
        }
        None => {
            properties.insert("policyRule".to_string(), Value::Object(Map::new()));
        }
    }

    if let Some(Value::Object(rule)) = properties.get_mut("policyRule") {
        rule.entry("if").or_insert_with(|| json!({ "allOf": [] }));
        rule.entry("then").or_insert_with(|| json!({}));
    }
}

/// Rule 6: rewrite `then.effect` to the token, returning the value it had.
fn rewrite_effect(rule: &mut Map<String, Value>) -> Option<Value> {
    let effect = rule
        .get_mut("then")
        .and_then(Value::as_object_mut)
        .and_then(|then| then.get_mut("effect"))?;

    if effect.as_str() == Some(EFFECT_TOKEN) {
        return None;
    }
    Some(std::mem::replace(effect, Value::String(EFFECT_TOKEN.to_string())))
}

fn references_effect(rule: &Map<String, Value>) -> bool {
    rule.get("then")
        .and_then(|then| then.get("effect"))
        .and_then(Value::as_str)
        == Some(EFFECT_TOKEN)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Normalizer for EnvelopeNormalizer {
    fn normalize(&self, value: Value) -> PolicyDocument {
        let mut properties = envelope_interior(value);

        ensure_text(&mut properties, "displayName");
        ensure_text(&mut properties, "description");

        if !matches!(properties.get("parameters"), Some(Value::Object(_))) {
            properties.insert("parameters".to_string(), Value::Object(Map::new()));
        }

        ensure_policy_rule(&mut properties);
        let mut original_effect = None;
        let mut declare = false;
        if let Some(Value::Object(rule)) = properties.get_mut("policyRule") {
            original_effect = rewrite_effect(rule);
            declare = self.options.declare_effect_parameter && references_effect(rule);
        }
        if let Some(original) = &original_effect {
            debug!(original = %original, "rewrote then.effect to the effect parameter");
        }

        if declare {
            if let Some(Value::Object(parameters)) = properties.get_mut("parameters") {
                if !parameters.contains_key("effect") {
                    parameters.insert(
                        "effect".to_string(),
                        self.effect_parameter(original_effect.as_ref()),
                    );
                }
            }
        }

        PolicyDocument::from_properties(properties)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use mend_contracts::document::{EFFECT_TOKEN, REQUIRED_FIELDS};
    use mend_core::traits::Normalizer;

    use super::{EnvelopeNormalizer, NormalizerOptions};

    fn normalize(value: Value) -> Value {
        EnvelopeNormalizer::new().normalize(value).into_value()
    }

    fn assert_has_required_fields(doc: &Value) {
        let root = doc.as_object().expect("envelope must be an object");
        assert_eq!(root.len(), 1, "only the properties key may remain: {doc}");
        for field in REQUIRED_FIELDS {
            assert!(
                doc["properties"].get(field).is_some(),
                "missing properties.{field} in {doc}"
            );
        }
        assert!(doc["properties"]["policyRule"].get("if").is_some());
        assert!(doc["properties"]["policyRule"].get("then").is_some());
    }

    // ── Totality ──────────────────────────────────────────────────────────────

    #[test]
    fn test_total_over_arbitrary_inputs() {
        let inputs = [
            json!({}),
            json!([]),
            json!([1, 2, 3]),
            json!(null),
            json!(42),
            json!("policy"),
            json!({ "unrelated": true }),
            json!({ "properties": "not a map" }),
            json!({ "properties": { "policyRule": "nonsense" } }),
        ];
        for input in inputs {
            assert_has_required_fields(&normalize(input));
        }
    }

    #[test]
    fn test_empty_input_gets_empty_shell() {
        let doc = normalize(json!({}));

        assert_eq!(doc["properties"]["displayName"], "");
        assert_eq!(doc["properties"]["description"], "");
        assert_eq!(doc["properties"]["parameters"], json!({}));
        assert_eq!(doc["properties"]["policyRule"], json!({ "if": { "allOf": [] }, "then": {} }));
    }

    #[test]
    fn test_non_string_text_fields_are_kept() {
        let doc = normalize(json!({
            "properties": { "displayName": 42, "description": ["a"] }
        }));

        assert_eq!(doc["properties"]["displayName"], 42);
        assert_eq!(doc["properties"]["description"], json!(["a"]));
    }

    // ── Envelope shaping ──────────────────────────────────────────────────────

    /// A stray `allOf` next to `properties` is discarded.
    #[test]
    fn test_sibling_root_keys_are_dropped() {
        let doc = normalize(json!({
            "properties": { "displayName": "Deny public IPs" },
            "allOf": [{ "field": "type", "equals": "x" }]
        }));

        assert!(doc.get("allOf").is_none());
        assert_eq!(doc["properties"]["displayName"], "Deny public IPs");
    }

    #[test]
    fn test_interior_without_wrapper_is_wrapped() {
        let doc = normalize(json!({
            "displayName": "Require HTTPS",
            "policyRule": { "if": { "field": "type", "equals": "x" }, "then": { "effect": "audit" } }
        }));

        assert_eq!(doc["properties"]["displayName"], "Require HTTPS");
        assert_eq!(doc["properties"]["policyRule"]["if"]["equals"], "x");
    }

    #[test]
    fn test_bare_rule_body_becomes_policy_rule() {
        let doc = normalize(json!({
            "if": { "field": "location", "notIn": ["westeurope"] },
            "then": { "effect": "deny" }
        }));

        assert_eq!(doc["properties"]["policyRule"]["if"]["field"], "location");
        assert_eq!(doc["properties"]["policyRule"]["then"]["effect"], EFFECT_TOKEN);
    }

    /// Existing text is never replaced; only absent or null fields are filled.
    #[test]
    fn test_existing_fields_are_kept() {
        let doc = normalize(json!({
            "properties": {
                "displayName": "Name",
                "description": null,
                "mode": "Indexed",
                "parameters": { "tagName": { "type": "String" } }
            }
        }));

        assert_eq!(doc["properties"]["displayName"], "Name");
        assert_eq!(doc["properties"]["description"], "");
        assert_eq!(doc["properties"]["mode"], "Indexed");
        assert_eq!(doc["properties"]["parameters"]["tagName"]["type"], "String");
    }

    #[test]
    fn test_missing_half_of_rule_is_filled() {
        let doc = normalize(json!({
            "properties": { "policyRule": { "if": { "field": "type", "equals": "x" } } }
        }));

        assert_eq!(doc["properties"]["policyRule"]["if"]["equals"], "x");
        assert_eq!(doc["properties"]["policyRule"]["then"], json!({}));
    }

    // ── Effect rewriting ──────────────────────────────────────────────────────

    /// String and numeric effects normalize to the same token.
    #[test]
    fn test_effect_values_collapse_to_token() {
        for effect in [json!("Deny"), json!(123), json!({ "value": "audit" })] {
            let doc = normalize(json!({
                "properties": {
                    "policyRule": { "if": { "field": "type", "equals": "x" }, "then": { "effect": effect } }
                }
            }));
            assert_eq!(doc["properties"]["policyRule"]["then"]["effect"], EFFECT_TOKEN);
        }
    }

    #[test]
    fn test_effect_parameter_declared_with_model_default() {
        let doc = normalize(json!({
            "properties": { "policyRule": { "if": { "field": "type", "equals": "x" }, "then": { "effect": "deny" } } }
        }));

        let effect = &doc["properties"]["parameters"]["effect"];
        assert_eq!(effect["type"], "String");
        assert_eq!(effect["defaultValue"], "Deny");
        assert_eq!(effect["allowedValues"], json!(["Audit", "Deny", "Disabled"]));
    }

    #[test]
    fn test_unrecognised_effect_uses_configured_default() {
        let doc = normalize(json!({
            "properties": { "policyRule": { "if": {}, "then": { "effect": 123 } } }
        }));

        assert_eq!(doc["properties"]["parameters"]["effect"]["defaultValue"], "Audit");
    }

    #[test]
    fn test_declared_effect_parameter_is_not_replaced() {
        let doc = normalize(json!({
            "properties": {
                "parameters": { "effect": { "type": "String", "defaultValue": "Disabled" } },
                "policyRule": { "if": {}, "then": { "effect": "deny" } }
            }
        }));

        assert_eq!(doc["properties"]["parameters"]["effect"]["defaultValue"], "Disabled");
    }

    /// No effect in `then`: nothing is invented.
    #[test]
    fn test_no_effect_means_no_parameter() {
        let doc = normalize(json!({ "properties": { "policyRule": { "if": {}, "then": {} } } }));

        assert!(doc["properties"]["policyRule"]["then"].get("effect").is_none());
        assert!(doc["properties"]["parameters"].get("effect").is_none());
    }

    #[test]
    fn test_declaration_can_be_disabled_from_toml() {
        let options: NormalizerOptions = toml::from_str("declare_effect_parameter = false").unwrap();
        assert_eq!(options.default_effect, "Audit");

        let doc = EnvelopeNormalizer::with_options(options)
            .normalize(json!({ "policyRule": { "if": {}, "then": { "effect": "deny" } } }))
            .into_value();

        assert_eq!(doc["properties"]["policyRule"]["then"]["effect"], EFFECT_TOKEN);
        assert!(doc["properties"]["parameters"].get("effect").is_none());
    }

    // ── Idempotence ───────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            json!({}),
            json!("scalar"),
            json!({ "allOf": [], "properties": { "policyRule": { "then": { "effect": "Deny" } } } }),
            json!({ "displayName": "x", "policyRule": { "if": { "anyOf": [] }, "then": { "effect": 1 } } }),
            json!({ "if": { "field": "type", "equals": "x" }, "then": { "effect": "audit" } }),
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(once.clone());
            assert_eq!(once, twice);
        }
    }
}
