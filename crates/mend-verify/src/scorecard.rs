//! Offline quality check for finished policy documents.
//!
//! The scorecard is stricter than the guardrails in one place: it also wants
//! `parameters.effect` declared with `"type": "String"`, which is what the
//! policy service needs to bind the effect token at assignment time. It never
//! short-circuits, so a score lists every issue found.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use mend_contracts::document::EFFECT_TOKEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreIssue {
    /// The input is not a JSON object, or not JSON at all.
    MissingFixedPolicy,
    MissingProperties,
    EmptyIf,
    MissingEffectParameter,
    ThenEffectNotParameterized,
}

impl ScoreIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingFixedPolicy => "missing_fixed_policy",
            Self::MissingProperties => "missing_properties",
            Self::EmptyIf => "empty_if",
            Self::MissingEffectParameter => "missing_effect_parameter",
            Self::ThenEffectNotParameterized => "then_effect_not_parameterized",
        }
    }
}

impl fmt::Display for ScoreIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scorecard {
    pub passed: bool,
    pub issues: Vec<ScoreIssue>,
}

/// Score a policy document given as text. Text that is not JSON scores as
/// `missing_fixed_policy`.
pub fn score_text(text: &str) -> Scorecard {
    match serde_json::from_str::<Value>(text) {
        Ok(policy) => score(&policy),
        Err(e) => {
            debug!(error = %e, "scored text is not JSON");
            Scorecard {
                passed: false,
                issues: vec![ScoreIssue::MissingFixedPolicy],
            }
        }
    }
}

/// Score a policy document.
pub fn score(policy: &Value) -> Scorecard {
    let Some(root) = policy.as_object() else {
        return Scorecard {
            passed: false,
            issues: vec![ScoreIssue::MissingFixedPolicy],
        };
    };

    let properties = root.get("properties");
    let rule = properties.and_then(|p| p.get("policyRule"));

    let mut issues = Vec::new();
    if properties.is_none() {
        issues.push(ScoreIssue::MissingProperties);
    }
    if !has_condition(rule.and_then(|r| r.get("if"))) {
        issues.push(ScoreIssue::EmptyIf);
    }
    if !declares_effect(properties) {
        issues.push(ScoreIssue::MissingEffectParameter);
    }
    if rule.and_then(|r| r.get("then")).and_then(|t| t.get("effect")).and_then(Value::as_str)
        != Some(EFFECT_TOKEN)
    {
        issues.push(ScoreIssue::ThenEffectNotParameterized);
    }

    Scorecard { passed: issues.is_empty(), issues }
}

fn has_condition(condition: Option<&Value>) -> bool {
    let Some(Value::Object(map)) = condition else {
        return false;
    };
    if map.is_empty() {
        return false;
    }
    ["allOf", "anyOf"].iter().all(|op| {
        !matches!(map.get(*op), Some(Value::Array(operands)) if operands.is_empty())
    })
}

fn declares_effect(properties: Option<&Value>) -> bool {
    properties
        .and_then(|p| p.get("parameters"))
        .and_then(|params| params.get("effect"))
        .and_then(|effect| effect.get("type"))
        .and_then(Value::as_str)
        == Some("String")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{score, score_text, ScoreIssue};

    fn complete() -> serde_json::Value {
        json!({
            "properties": {
                "displayName": "Require tag owner",
                "description": "",
                "parameters": { "effect": { "type": "String", "defaultValue": "Audit" } },
                "policyRule": {
                    "if": { "field": "tags['owner']", "exists": "false" },
                    "then": { "effect": "[parameters('effect')]" }
                }
            }
        })
    }

    #[test]
    fn test_complete_document_passes() {
        let card = score(&complete());

        assert!(card.passed);
        assert!(card.issues.is_empty());
    }

    #[test]
    fn test_non_object_is_missing_fixed_policy_only() {
        for value in [json!(null), json!([1, 2]), json!("policy")] {
            let card = score(&value);
            assert!(!card.passed);
            assert_eq!(card.issues, vec![ScoreIssue::MissingFixedPolicy]);
        }
    }

    #[test]
    fn test_non_json_text_is_missing_fixed_policy() {
        for text in ["", "not json", "{\"properties\": "] {
            let card = score_text(text);
            assert!(!card.passed);
            assert_eq!(card.issues, vec![ScoreIssue::MissingFixedPolicy]);
        }
    }

    #[test]
    fn test_json_text_is_scored_as_document() {
        let card = score_text(&complete().to_string());

        assert!(card.passed);
    }

    #[test]
    fn test_empty_object_lists_every_issue_in_order() {
        let card = score(&json!({}));

        assert_eq!(
            card.issues,
            vec![
                ScoreIssue::MissingProperties,
                ScoreIssue::EmptyIf,
                ScoreIssue::MissingEffectParameter,
                ScoreIssue::ThenEffectNotParameterized,
            ]
        );
    }

    #[test]
    fn test_empty_all_of_is_empty_if() {
        let mut doc = complete();
        doc["properties"]["policyRule"]["if"] = json!({ "allOf": [] });

        assert_eq!(score(&doc).issues, vec![ScoreIssue::EmptyIf]);
    }

    /// The guardrails accept a document without a declared effect
    /// parameter; the scorecard does not.
    #[test]
    fn test_undeclared_effect_parameter() {
        let mut doc = complete();
        doc["properties"]["parameters"] = json!({});

        assert_eq!(score(&doc).issues, vec![ScoreIssue::MissingEffectParameter]);
    }

    #[test]
    fn test_effect_parameter_with_wrong_type() {
        let mut doc = complete();
        doc["properties"]["parameters"]["effect"]["type"] = json!("Array");

        assert_eq!(score(&doc).issues, vec![ScoreIssue::MissingEffectParameter]);
    }

    #[test]
    fn test_literal_effect_is_not_parameterized() {
        let mut doc = complete();
        doc["properties"]["policyRule"]["then"]["effect"] = json!("deny");

        assert_eq!(score(&doc).issues, vec![ScoreIssue::ThenEffectNotParameterized]);
    }

    #[test]
    fn test_issue_serializes_snake_case() {
        let encoded = serde_json::to_string(&ScoreIssue::ThenEffectNotParameterized).unwrap();

        assert_eq!(encoded, "\"then_effect_not_parameterized\"");
        assert_eq!(ScoreIssue::EmptyIf.to_string(), "empty_if");
    }
}
