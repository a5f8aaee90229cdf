//! MEND command-line interface.
//!
//! Runs the repair pipeline on files (or stdin) and the scripted Azure demo
//! scenarios.
//!
//! Usage:
//!   cargo run -p demo -- extract answer.txt
//!   cargo run -p demo -- check answer.txt
//!   cargo run -p demo -- repair --instruction "Require tag owner on all resources" \
//!       --retry-file second-answer.txt --trace answer.txt
//!   cargo run -p demo -- score policy.json
//!   cargo run -p demo -- demo run-all
//!
//! Exit status: 0 on success, 1 when the input is invalid, rejected or fails
//! the scorecard, 2 on configuration or I/O errors.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mend_contracts::error::{GenerationError, MendError, MendResult};
use mend_core::traits::Extractor;
use mend_extract::JsonExtractor;
use mend_ref_azure::{
    build_engine,
    scenarios::{clean_output, heuristic_fallback, rejected, retry_fixes, ScriptedGenerator},
    RuntimeConfig,
};
use mend_trace::InMemoryTrace;
use mend_verify::score_text;

// ── CLI definition ────────────────────────────────────────────────────────────

/// MEND: repair model-generated Azure Policy definitions.
#[derive(Parser)]
#[command(
    name = "mend",
    about = "Extract, validate and repair model-generated policy definitions",
    long_about = "Recovers a policy definition from model output, reshapes it into the\n\
                  Azure Policy envelope, checks it against the guardrails, and repairs\n\
                  it with one regeneration and a keyword fallback table."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the last complete JSON object found in FILE.
    Extract {
        /// Model output, or `-` for stdin.
        file: PathBuf,
    },
    /// Extract, normalize and validate FILE once.
    Check {
        file: PathBuf,
        /// Runtime TOML (normalizer options and fallback rules).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the full repair loop on FILE.
    Repair {
        /// The user's request; used for fallback keyword matching.
        #[arg(long)]
        instruction: String,
        file: PathBuf,
        /// Text the generator replies with on regeneration. Without it the
        /// regeneration fails.
        #[arg(long)]
        retry_file: Option<PathBuf>,
        /// Runtime TOML replacing the embedded Azure default table.
        #[arg(long)]
        fallback_table: Option<PathBuf>,
        /// Also print the hash-chained attempt trace.
        #[arg(long)]
        trace: bool,
    },
    /// Print the scorecard of a policy document.
    Score { file: PathBuf },
    /// Run the scripted Azure scenarios.
    Demo {
        #[command(subcommand)]
        scenario: Option<Scenario>,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum Scenario {
    /// Run all four scenarios in sequence.
    RunAll,
    /// Scenario 1: the first answer is accepted.
    CleanOutput,
    /// Scenario 2: one regeneration fixes an empty rule body.
    RetryFixes,
    /// Scenario 3: the fallback table supplies the rule body.
    HeuristicFallback,
    /// Scenario 4: nothing helps and the request is rejected.
    Rejected,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Extract { file } => run_extract(&file),
        Command::Check { file, config } => run_check(&file, config.as_deref()),
        Command::Repair { instruction, file, retry_file, fallback_table, trace } => run_repair(
            &instruction,
            &file,
            retry_file.as_deref(),
            fallback_table.as_deref(),
            trace,
        ),
        Command::Score { file } => run_score(&file),
        Command::Demo { scenario } => run_demo(scenario.unwrap_or(Scenario::RunAll)),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("mend: {}", e);
            ExitCode::from(2)
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn run_extract(file: &Path) -> MendResult<ExitCode> {
    let raw = read_input(file)?;

    match JsonExtractor::new().extract(&raw) {
        Ok(value) => {
            print_json(&value)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("mend: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_check(file: &Path, config: Option<&Path>) -> MendResult<ExitCode> {
    let raw = read_input(file)?;
    let engine = build_engine(&load_config(config)?)?;

    let outcome = engine.check(&raw);
    print_json(&outcome)?;

    Ok(exit_code(outcome.is_valid()))
}

fn run_repair(
    instruction: &str,
    file: &Path,
    retry_file: Option<&Path>,
    fallback_table: Option<&Path>,
    with_trace: bool,
) -> MendResult<ExitCode> {
    let raw = read_input(file)?;
    let engine = build_engine(&load_config(fallback_table)?)?;

    let generator = match retry_file {
        Some(path) => ScriptedGenerator::replying(read_input(path)?),
        None => ScriptedGenerator::failing(GenerationError::Unavailable {
            reason: "no --retry-file given".to_string(),
        }),
    };

    let trace = InMemoryTrace::new();
    let report = engine.repair_traced(&raw, instruction, &generator, &trace);
    let accepted = report.outcome.is_accepted();

    if with_trace {
        print_json(&json!({
            "report": report,
            "trace": trace.export(),
            "trace_intact": trace.verify_integrity(),
        }))?;
    } else {
        print_json(&report)?;
    }

    Ok(exit_code(accepted))
}

fn run_score(file: &Path) -> MendResult<ExitCode> {
    let raw = read_input(file)?;

    let card = score_text(&raw);
    print_json(&card)?;

    Ok(exit_code(card.passed))
}

fn run_demo(scenario: Scenario) -> MendResult<ExitCode> {
    print_banner();

    match scenario {
        Scenario::RunAll => {
            clean_output::run_scenario()?;
            retry_fixes::run_scenario()?;
            heuristic_fallback::run_scenario()?;
            rejected::run_scenario()?;
        }
        Scenario::CleanOutput => clean_output::run_scenario()?,
        Scenario::RetryFixes => retry_fixes::run_scenario()?,
        Scenario::HeuristicFallback => heuristic_fallback::run_scenario()?,
        Scenario::Rejected => rejected::run_scenario()?,
    }

    println!("All selected scenarios completed.");
    Ok(ExitCode::SUCCESS)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Read `path`, or stdin when it is `-`.
fn read_input(path: &Path) -> MendResult<String> {
    let io_error = |e: std::io::Error| MendError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer).map_err(io_error)?;
        debug!(bytes = buffer.len(), "read input from stdin");
        Ok(buffer)
    } else {
        std::fs::read_to_string(path).map_err(io_error)
    }
}

fn load_config(path: Option<&Path>) -> MendResult<RuntimeConfig> {
    match path {
        Some(path) => RuntimeConfig::from_file(path),
        None => RuntimeConfig::azure_default(),
    }
}

fn print_json<T: Serialize>(value: &T) -> MendResult<()> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| MendError::Io {
        path: "<stdout>".to_string(),
        reason: format!("failed to render JSON: {}", e),
    })?;
    println!("{}", rendered);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("MEND: Policy Document Extraction & Repair");
    println!("Azure Reference Demo");
    println!("=========================================");
    println!();
    println!("MEND repair pipeline per request:");
    println!("  [1] Extract the last complete JSON object from the model's text");
    println!("  [2] Normalize it into the properties envelope; effect → [parameters('effect')]");
    println!("  [3] Guardrails: required fields, non-empty policyRule.if, parameterized effect");
    println!("  [4] On failure: ONE regeneration with the violation as feedback");
    println!("  [5] Still an empty rule body: canned condition from the fallback table");
    println!("  [6] Every attempt appended to a SHA-256 hash-chained trace");
    println!();
}
