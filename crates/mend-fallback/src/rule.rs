//! Fallback table entry types and configuration schema.
//!
//! A `FallbackConfig` is deserialized from TOML and holds an ordered list of
//! `FallbackRule`s. Entries are matched in declaration order and the first
//! match wins.

use serde::{Deserialize, Serialize};

/// A single table entry loaded from TOML.
///
/// `clause` is the JSON text of a `policyRule.if` condition. It is kept as a
/// string here so table authors can paste it from a real policy definition
/// in a TOML literal string.
///
/// ```toml
/// [[rules]]
/// id = "storage-min-tls"
/// description = "Storage accounts must use TLS 1.2"
/// keywords = ["minimum tls", "tls version"]
/// clause = '''
/// { "allOf": [
///   { "field": "type", "equals": "Microsoft.Storage/storageAccounts" },
///   { "field": "Microsoft.Storage/storageAccounts/minimumTlsVersion", "notEquals": "TLS1_2" }
/// ] }
/// '''
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackRule {
    /// Stable identifier used in logs and repair reports.
    pub id: String,

    #[serde(default)]
    pub description: String,

    /// Case-insensitive substrings of the instruction text. Any one of them
    /// selects this entry.
    pub keywords: Vec<String>,

    /// The canned condition, as JSON text.
    pub clause: String,
}

impl FallbackRule {
    /// Return true if any keyword occurs in `instruction`. Blank keywords
    /// never match.
    ///
    /// `instruction` must already be lower-cased.
    pub fn matches(&self, instruction: &str) -> bool {
        self.keywords
            .iter()
            .map(|keyword| keyword.trim())
            .filter(|keyword| !keyword.is_empty())
            .any(|keyword| instruction.contains(&keyword.to_lowercase()))
    }
}

/// The top-level structure deserialized from a TOML fallback table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Ordered list of entries. First match wins.
    #[serde(default)]
    pub rules: Vec<FallbackRule>,
}
