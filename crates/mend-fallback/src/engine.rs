//! TOML-driven fallback table implementation.
//!
//! `TomlFallbackTable` loads a `FallbackConfig` from a TOML string or file,
//! checks every entry up front, and implements the `FallbackPolicy` trait
//! from mend-core.
//!
//! Lookup algorithm:
//!
//! 1. Lower-case the instruction.
//! 2. Return the first entry, in declaration order, with a keyword that is a
//!    substring of it.
//! 3. If no entry matches, return `None`.

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, info};

use mend_contracts::{
    error::{MendError, MendResult},
    repair::FallbackMatch,
};
use mend_core::traits::FallbackPolicy;

use crate::rule::{FallbackConfig, FallbackRule};

/// An entry whose clause has already been parsed.
#[derive(Debug, Clone)]
struct CompiledRule {
    rule: FallbackRule,
    clause: Map<String, Value>,
}

/// A `FallbackPolicy` backed by a TOML document.
///
/// ```rust,ignore
/// use mend_fallback::TomlFallbackTable;
///
/// let table = TomlFallbackTable::from_file(Path::new("tables/azure-default.toml"))?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlFallbackTable {
    rules: Vec<CompiledRule>,
}

impl TomlFallbackTable {
    /// Parse `s` as TOML and build a `TomlFallbackTable`.
    ///
    /// Returns `MendError::Config` if the TOML is malformed, an entry has no
    /// usable keyword, or an entry's clause is not a non-empty JSON object.
    pub fn from_toml_str(s: &str) -> MendResult<Self> {
        let config: FallbackConfig = toml::from_str(s).map_err(|e| MendError::Config {
            reason: format!("failed to parse fallback TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a TOML fallback table.
    pub fn from_file(path: &Path) -> MendResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MendError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check and compile an already-deserialized configuration.
    pub fn from_config(config: FallbackConfig) -> MendResult<Self> {
        let rules = config
            .rules
            .into_iter()
            .map(compile)
            .collect::<MendResult<Vec<_>>>()?;

        info!(entries = rules.len(), "fallback table loaded");
        Ok(Self { rules })
    }

    /// Entry identifiers in declaration order.
    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|compiled| compiled.rule.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn compile(rule: FallbackRule) -> MendResult<CompiledRule> {
    if rule.keywords.is_empty() {
        return Err(MendError::Config {
            reason: format!("fallback rule '{}' has no keywords", rule.id),
        });
    }
    // A blank keyword is a substring of every instruction.
    if let Some(index) = rule.keywords.iter().position(|k| k.trim().is_empty()) {
        return Err(MendError::Config {
            reason: format!("fallback rule '{}' has a blank keyword at index {}", rule.id, index),
        });
    }

    let clause = match serde_json::from_str::<Value>(&rule.clause) {
        Ok(Value::Object(map)) if !map.is_empty() => map,
        Ok(_) => {
            return Err(MendError::Config {
                reason: format!("fallback rule '{}' clause must be a non-empty JSON object", rule.id),
            })
        }
        Err(e) => {
            return Err(MendError::Config {
                reason: format!("fallback rule '{}' clause is not valid JSON: {}", rule.id, e),
            })
        }
    };

    Ok(CompiledRule { rule, clause })
}

impl FallbackPolicy for TomlFallbackTable {
    fn canned_clause(&self, instruction: &str) -> Option<FallbackMatch> {
        let lowered = instruction.to_lowercase();

        let found = self.rules.iter().find(|compiled| compiled.rule.matches(&lowered));
        match found {
            Some(compiled) => {
                debug!(rule_id = %compiled.rule.id, "fallback entry matched");
                Some(FallbackMatch {
                    rule_id: compiled.rule.id.clone(),
                    clause: Value::Object(compiled.clause.clone()),
                })
            }
            None => {
                debug!(entries = self.rules.len(), "no fallback entry matched");
                None
            }
        }
    }
}
