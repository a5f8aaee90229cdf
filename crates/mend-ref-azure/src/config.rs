//! Runtime configuration: normalizer options plus the fallback table.
//!
//! One TOML document configures a whole engine:
//!
//! ```toml
//! [normalizer]
//! default_effect = "Deny"
//!
//! [[rules]]
//! id = "storage-minimum-tls"
//! keywords = ["minimum tls"]
//! clause = '''{ "field": "Microsoft.Storage/storageAccounts/minimumTlsVersion", "notEquals": "TLS1_2" }'''
//! ```
//!
//! Both sections are optional. A missing `[normalizer]` uses
//! `NormalizerOptions::default()`; a missing `rules` array yields an empty
//! fallback table.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mend_contracts::error::{MendError, MendResult};
use mend_fallback::{FallbackConfig, FallbackRule, TomlFallbackTable};
use mend_verify::NormalizerOptions;

/// The Azure default table shipped with the reference runtime.
pub const AZURE_DEFAULT_TABLE: &str = include_str!("../tables/azure-default.toml");

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub normalizer: NormalizerOptions,

    #[serde(default)]
    pub rules: Vec<FallbackRule>,
}

impl RuntimeConfig {
    /// Returns `MendError::Config` if the TOML is malformed.
    pub fn from_toml_str(s: &str) -> MendResult<Self> {
        let config: RuntimeConfig = toml::from_str(s).map_err(|e| MendError::Config {
            reason: format!("failed to parse runtime TOML: {}", e),
        })?;
        debug!(rules = config.rules.len(), "runtime configuration parsed");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> MendResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MendError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded Azure default configuration.
    pub fn azure_default() -> MendResult<Self> {
        Self::from_toml_str(AZURE_DEFAULT_TABLE)
    }

    /// Compile the `rules` section into a fallback table.
    pub fn fallback_table(&self) -> MendResult<TomlFallbackTable> {
        TomlFallbackTable::from_config(FallbackConfig {
            rules: self.rules.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use mend_contracts::error::MendError;
    use mend_core::traits::FallbackPolicy;

    use super::RuntimeConfig;

    #[test]
    fn test_azure_default_loads() {
        let config = RuntimeConfig::azure_default().unwrap();
        let table = config.fallback_table().unwrap();

        assert_eq!(table.len(), 5);
        assert!(config.normalizer.declare_effect_parameter);
        assert_eq!(config.normalizer.default_effect, "Audit");
    }

    /// Every storage and tagging instruction from the evaluation set has an
    /// entry; the App Configuration one has none.
    #[test]
    fn test_azure_default_covers_evaluation_instructions() {
        let table = RuntimeConfig::azure_default().unwrap().fallback_table().unwrap();

        let expected = [
            ("Disallow public network access on storage accounts", "storage-public-network-access"),
            ("Require secure transfer (HTTPS) for storage accounts", "storage-secure-transfer"),
            ("Enforce minimum TLS version 1.2 for storage accounts", "storage-minimum-tls"),
            ("Disable public blob access on storage accounts", "storage-public-blob-access"),
            ("Require tag owner on all resources", "require-owner-tag"),
        ];
        for (instruction, rule_id) in expected {
            let found = table.canned_clause(instruction).unwrap();
            assert_eq!(found.rule_id, rule_id, "instruction: {instruction}");
        }

        assert!(table
            .canned_clause("App Configuration should use a customer-managed key for encryption")
            .is_none());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = RuntimeConfig::from_toml_str("").unwrap();

        assert!(config.rules.is_empty());
        assert_eq!(config.normalizer.allowed_effects, vec!["Audit", "Deny", "Disabled"]);
    }

    #[test]
    fn test_partial_normalizer_section() {
        let config = RuntimeConfig::from_toml_str("[normalizer]\ndefault_effect = \"Deny\"\n").unwrap();

        assert_eq!(config.normalizer.default_effect, "Deny");
        assert!(config.normalizer.declare_effect_parameter);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = RuntimeConfig::from_toml_str("[normalizer\n");

        assert!(matches!(result, Err(MendError::Config { .. })));
    }
}
