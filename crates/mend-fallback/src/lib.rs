//! # mend-fallback
//!
//! A TOML-driven table of canned `policyRule.if` clauses for the MEND
//! pipeline.
//!
//! ## Overview
//!
//! When a model keeps producing an empty rule body, the repair engine asks
//! a [`FallbackPolicy`](mend_core::traits::FallbackPolicy) for a hand-authored
//! condition matching the user's instruction. [`TomlFallbackTable`] is that
//! policy: entries are declared in a TOML file, matched by keyword in order,
//! and the first match wins. If nothing matches, the engine rejects.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use mend_fallback::TomlFallbackTable;
//!
//! let table = TomlFallbackTable::from_file(Path::new("tables/azure-default.toml"))?;
//! // Pass `Box::new(table)` to `mend_core::RepairEngine::new(...)`.
//! ```

pub mod engine;
pub mod rule;

pub use engine::TomlFallbackTable;
pub use rule::{FallbackConfig, FallbackRule};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use mend_contracts::error::MendError;
    use mend_core::traits::FallbackPolicy;

    use crate::{FallbackRule, TomlFallbackTable};

    const TWO_RULES: &str = r#"
        [[rules]]
        id = "storage-public-network"
        description = "Storage accounts must not allow public network access"
        keywords = ["public network access"]
        clause = '''{ "field": "Microsoft.Storage/storageAccounts/publicNetworkAccess", "notEquals": "Disabled" }'''

        [[rules]]
        id = "any-storage"
        description = "Catch-all for storage instructions"
        keywords = ["Storage Account", "storage accounts"]
        clause = '''{ "field": "type", "equals": "Microsoft.Storage/storageAccounts" }'''
    "#;

    fn table() -> TomlFallbackTable {
        TomlFallbackTable::from_toml_str(TWO_RULES).unwrap()
    }

    fn expect_config_error(toml: &str, fragment: &str) {
        match TomlFallbackTable::from_toml_str(toml) {
            Err(MendError::Config { reason }) => {
                assert!(reason.contains(fragment), "unexpected reason: {reason}");
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    // ── 1. matching ───────────────────────────────────────────────────────────

    #[test]
    fn test_keyword_match_returns_parsed_clause() {
        let found = table()
            .canned_clause("Disallow public network access on storage accounts")
            .unwrap();

        assert_eq!(found.rule_id, "storage-public-network");
        assert_eq!(
            found.clause,
            json!({ "field": "Microsoft.Storage/storageAccounts/publicNetworkAccess", "notEquals": "Disabled" })
        );
    }

    #[test]
    fn test_matching_is_case_insensitive_both_ways() {
        let found = table().canned_clause("LOCK DOWN STORAGE ACCOUNTS").unwrap();

        assert_eq!(found.rule_id, "any-storage");
    }

    /// Both entries match; only the first declared one is returned.
    #[test]
    fn test_first_match_wins() {
        let found = table()
            .canned_clause("storage accounts: block public network access")
            .unwrap();

        assert_eq!(found.rule_id, "storage-public-network");
    }

    #[test]
    fn test_no_match_returns_none() {
        assert!(table().canned_clause("Require tag owner on all resources").is_none());
    }

    #[test]
    fn test_empty_table_matches_nothing() {
        let table = TomlFallbackTable::from_toml_str("rules = []").unwrap();

        assert!(table.is_empty());
        assert!(table.canned_clause("anything at all").is_none());
    }

    #[test]
    fn test_rule_ids_keep_declaration_order() {
        let table = table();
        let ids: Vec<&str> = table.rule_ids().collect();

        assert_eq!(ids, vec!["storage-public-network", "any-storage"]);
    }

    /// A rule built in code bypasses loading; its blank keyword still
    /// matches nothing.
    #[test]
    fn test_blank_keyword_never_matches() {
        let rule = FallbackRule {
            id: "tls".to_string(),
            description: String::new(),
            keywords: vec!["minimum tls".to_string(), " ".to_string()],
            clause: "{}".to_string(),
        };

        assert!(rule.matches("enforce minimum tls 1.2"));
        assert!(!rule.matches("app configuration should use a customer-managed key"));
    }

    // ── 2. load errors ────────────────────────────────────────────────────────

    #[test]
    fn test_toml_parse_error() {
        expect_config_error("this is not valid toml ][[[", "failed to parse fallback TOML");
    }

    #[test]
    fn test_rule_without_keywords_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "no-keywords"
            keywords = []
            clause = '''{ "field": "type", "equals": "x" }'''
        "#;

        expect_config_error(toml, "no keywords");
    }

    #[test]
    fn test_blank_keywords_are_rejected() {
        let toml = r#"
            [[rules]]
            id = "blank"
            keywords = ["", "  "]
            clause = '''{ "field": "type", "equals": "x" }'''
        "#;

        expect_config_error(toml, "blank keyword");
    }

    /// One blank keyword next to a real one still rejects the entry, since
    /// it would match every instruction.
    #[test]
    fn test_blank_keyword_beside_real_one_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "tls"
            keywords = ["minimum tls", ""]
            clause = '''{ "field": "type", "equals": "x" }'''
        "#;

        expect_config_error(toml, "blank keyword at index 1");
    }

    #[test]
    fn test_non_json_clause_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "bad-json"
            keywords = ["tls"]
            clause = "field = type"
        "#;

        expect_config_error(toml, "not valid JSON");
    }

    #[test]
    fn test_empty_object_clause_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "empty"
            keywords = ["tls"]
            clause = "{}"
        "#;

        expect_config_error(toml, "non-empty JSON object");
    }

    #[test]
    fn test_array_clause_is_rejected() {
        let toml = r#"
            [[rules]]
            id = "array"
            keywords = ["tls"]
            clause = "[1, 2]"
        "#;

        expect_config_error(toml, "non-empty JSON object");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = TomlFallbackTable::from_file(std::path::Path::new("/nonexistent/table.toml"));

        assert!(matches!(result, Err(MendError::Io { .. })));
    }
}
