//! Azure reference runtime demo scenarios.
//!
//! Each scenario wires the default engine, replays hardcoded model replies
//! through a `ScriptedGenerator`, and records the request in an
//! `InMemoryTrace`. `execute()` returns the result for tests;
//! `run_scenario()` prints it for the demo binary.

pub mod clean_output;
pub mod heuristic_fallback;
pub mod rejected;
pub mod retry_fixes;

use std::sync::{Arc, Mutex, PoisonError};

use mend_contracts::{
    error::{GenerationError, MendResult},
    repair::{AttemptVerdict, RepairOutcome, RepairReport},
};
use mend_core::traits::Generator;
use mend_trace::{InMemoryTrace, TraceLog};

use crate::default_engine;

// ── Scripted generator ────────────────────────────────────────────────────────

/// A `Generator` that always gives the same reply and remembers the
/// feedback it was sent. Clones share the call log.
#[derive(Clone)]
pub struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Feedback texts received, in call order.
    pub fn feedback(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, feedback: &str) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(feedback.to_string());
        self.reply.clone()
    }
}

// ── Scenario plumbing ─────────────────────────────────────────────────────────

/// Everything a scenario produced.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub report: RepairReport,
    pub trace: TraceLog,
    pub trace_intact: bool,
    /// Feedback texts the generator received.
    pub feedback: Vec<String>,
}

/// Run one traced request through the default engine.
pub fn run_scripted(
    raw: &str,
    instruction: &str,
    generator: &ScriptedGenerator,
) -> MendResult<ScenarioRun> {
    let engine = default_engine()?;
    let trace = InMemoryTrace::new();

    let report = engine.repair_traced(raw, instruction, generator, &trace);

    Ok(ScenarioRun {
        report,
        trace_intact: trace.verify_integrity(),
        trace: trace.export(),
        feedback: generator.feedback(),
    })
}

/// Print the walk-through of a finished scenario.
pub fn print_run(run: &ScenarioRun) {
    let report = &run.report;

    for attempt in &report.attempts {
        let verdict = match &attempt.verdict {
            AttemptVerdict::Valid => "Valid".to_string(),
            AttemptVerdict::Invalid { kind, detail } => format!("Invalid({kind}): {detail}"),
        };
        println!("  {:<10} {}", format!("{:?}", attempt.stage), verdict);
    }
    if let Some(feedback) = run.feedback.first() {
        println!();
        println!("  Retry feedback:");
        for line in feedback.lines() {
            println!("    | {}", line);
        }
    }
    println!();

    match &report.outcome {
        RepairOutcome::Accepted { document, heuristic } => {
            println!("  Outcome:          ACCEPTED{}", if *heuristic { " (heuristic)" } else { "" });
            let rendered = serde_json::to_string_pretty(document.as_value())
                .unwrap_or_else(|e| format!("<unprintable: {e}>"));
            for line in rendered.lines() {
                println!("    {}", line);
            }
        }
        RepairOutcome::Rejected { kind, detail } => {
            println!("  Outcome:          REJECTED ({kind})");
            println!("  Detail:           {}", detail);
        }
    }
    println!("  Retried:          {}", report.retried);
    println!("  Fallback used:    {}", report.fallback_used);
    println!(
        "  Trace integrity:  {} ({} event(s), terminal {})",
        if run.trace_intact { "VERIFIED" } else { "FAILED" },
        run.trace.events.len(),
        short_hash(&run.trace.terminal_hash)
    );
    println!();
}

fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
