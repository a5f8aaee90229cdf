//! Scenario 1: Clean Output
//!
//! The model answers "Require secure transfer (HTTPS) for storage accounts"
//! with a complete definition wrapped in prose and a markdown fence, using a
//! literal `"Deny"` effect.
//!
//! Pipeline walk-through:
//!   1. Extractor skips the prose and fence
//!   2. Normalizer collapses `"Deny"` to the effect token and declares
//!      `parameters.effect` with default `Deny`
//!   3. Guardrails pass → Accepted, the generator is never called

use mend_contracts::error::MendResult;

use super::{print_run, run_scripted, ScenarioRun, ScriptedGenerator};

pub const INSTRUCTION: &str = "Require secure transfer (HTTPS) for storage accounts";

pub const MODEL_OUTPUT: &str = r#"Sure! Here is an Azure Policy definition that enforces secure transfer:

```json
{
  "properties": {
    "displayName": "Storage accounts should use secure transfer",
    "description": "Audit or deny storage accounts that accept plain HTTP traffic.",
    "mode": "Indexed",
    "policyRule": {
      "if": {
        "allOf": [
          { "field": "type", "equals": "Microsoft.Storage/storageAccounts" },
          { "field": "Microsoft.Storage/storageAccounts/supportsHttpsTrafficOnly", "equals": "false" }
        ]
      },
      "then": { "effect": "Deny" }
    }
  }
}
```

Assign it at subscription scope to cover every account."#;

pub fn execute() -> MendResult<ScenarioRun> {
    let generator = ScriptedGenerator::replying("unused");
    run_scripted(MODEL_OUTPUT, INSTRUCTION, &generator)
}

pub fn run_scenario() -> MendResult<()> {
    println!("=== Scenario 1: Clean Output ===");
    println!();
    println!("  Instruction: {}", INSTRUCTION);
    println!();

    let run = execute()?;
    print_run(&run);

    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}
