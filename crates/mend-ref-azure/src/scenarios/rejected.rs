//! Scenario 4: Rejected
//!
//! "App Configuration should use a customer-managed key for encryption" has
//! no entry in the default table. Both the first answer and the regenerated
//! one leave the rule body empty, so the request is rejected with the
//! retry's violation.
//!
//! Pipeline walk-through:
//!   1. Initial pass → Invalid(EmptyRuleBody)
//!   2. Retry → Invalid(EmptyRuleBody)
//!   3. No table entry matches → Rejected(EmptyRuleBody)

use mend_contracts::error::MendResult;

use super::{print_run, run_scripted, ScenarioRun, ScriptedGenerator};

pub const INSTRUCTION: &str = "App Configuration should use a customer-managed key for encryption";

pub const MODEL_OUTPUT: &str = r#"```json
{"properties": {"displayName": "App Configuration CMK", "policyRule": {"if": {}, "then": {"effect": "audit"}}}}
```"#;

pub const REGENERATED_OUTPUT: &str = r#"{"properties": {"displayName": "App Configuration CMK", "policyRule": {"if": {"anyOf": []}, "then": {"effect": "audit"}}}}"#;

pub fn execute() -> MendResult<ScenarioRun> {
    let generator = ScriptedGenerator::replying(REGENERATED_OUTPUT);
    run_scripted(MODEL_OUTPUT, INSTRUCTION, &generator)
}

pub fn run_scenario() -> MendResult<()> {
    println!("=== Scenario 4: Rejected ===");
    println!();
    println!("  Instruction: {}", INSTRUCTION);
    println!();

    let run = execute()?;
    print_run(&run);

    println!("  Scenario 4 complete.");
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use mend_contracts::{document::ViolationKind, repair::RepairOutcome};

    use super::execute;

    #[test]
    fn test_unmatched_instruction_is_rejected() {
        let run = execute().unwrap();
        let report = &run.report;

        assert!(report.retried);
        assert!(!report.fallback_used);
        match &report.outcome {
            RepairOutcome::Rejected { kind, detail } => {
                assert_eq!(*kind, ViolationKind::EmptyRuleBody);
                assert!(detail.contains("anyOf"), "the retry's detail is reported: {detail}");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_rejection_is_sealed_in_trace() {
        let run = execute().unwrap();

        assert!(run.trace.sealed);
        assert_eq!(run.trace.events.len(), 2);
        assert!(run.trace_intact);
    }
}
