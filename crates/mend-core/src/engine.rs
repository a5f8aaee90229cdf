//! The MEND repair engine: bounded retry-with-feedback and heuristic fallback.
//!
//! Every request walks the same three-state machine:
//!
//!   Initial → RetryOnce → Fallback
//!
//! `Initial` runs Extract → Normalize → Validate on the caller's text.
//! `RetryOnce` calls the injected `Generator` exactly once with feedback that
//! names the violation, then reruns the pipeline. `Fallback` patches an empty
//! rule body from the `FallbackPolicy` table or rejects. There are no
//! counters: each state is entered at most once, so the generator can never
//! be called twice for the same request.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use mend_contracts::{
    document::{PolicyDocument, ValidationOutcome, ViolationKind, EFFECT_TOKEN},
    repair::{AttemptRecord, AttemptVerdict, RepairOutcome, RepairReport, RequestId, Stage},
};

use crate::traits::{Extractor, FallbackPolicy, Generator, Guardrail, Normalizer, TraceSink};

/// A failed pass, kept so later states can fall back on its candidate.
#[derive(Debug)]
struct Rejection {
    candidate: Option<PolicyDocument>,
    kind: ViolationKind,
    detail: String,
}

impl Rejection {
    fn from_outcome(outcome: ValidationOutcome) -> Result<Rejection, PolicyDocument> {
        match outcome {
            ValidationOutcome::Valid { document } => Err(document),
            ValidationOutcome::Invalid { candidate, kind, detail } => Ok(Rejection {
                candidate,
                kind,
                detail,
            }),
        }
    }
}

/// Orchestrator states. Each is entered at most once per request.
enum Phase {
    Initial,
    RetryOnce { first: Rejection },
    Fallback { first: Rejection, last: Rejection },
}

/// Per-request bookkeeping: attempts, optional sink, last raw text.
struct Transcript<'a> {
    request_id: RequestId,
    sink: Option<&'a dyn TraceSink>,
    attempts: Vec<AttemptRecord>,
    raw_output: String,
}

impl<'a> Transcript<'a> {
    fn new(sink: Option<&'a dyn TraceSink>) -> Self {
        Self {
            request_id: RequestId::new(),
            sink,
            attempts: Vec::new(),
            raw_output: String::new(),
        }
    }

    fn record(&mut self, stage: Stage, outcome: &ValidationOutcome, raw: Option<&str>) {
        if let Some(raw) = raw {
            self.raw_output = raw.to_string();
        }
        let record = AttemptRecord {
            stage,
            verdict: AttemptVerdict::from(outcome),
            raw_output: raw.map(str::to_string),
            timestamp: Utc::now(),
        };

        // A broken sink must not change what the caller receives.
        if let Some(sink) = self.sink {
            if let Err(e) = sink.append(&self.request_id.0.to_string(), &record) {
                warn!(
                    request_id = %self.request_id.0,
                    stage = ?stage,
                    error = %e,
                    "trace sink rejected attempt record"
                );
            }
        }
        self.attempts.push(record);
    }

    fn finish(self, outcome: RepairOutcome, empty_if_before_fix: bool) -> RepairReport {
        let request_id = self.request_id.0.to_string();
        if let Some(sink) = self.sink {
            if let Err(e) = sink.seal(&request_id) {
                warn!(request_id = %request_id, error = %e, "trace sink failed to seal");
            }
        }

        let retried = self.attempts.iter().any(|a| a.stage == Stage::Retry);
        let fallback_used = matches!(outcome, RepairOutcome::Accepted { heuristic: true, .. });

        match &outcome {
            RepairOutcome::Accepted { heuristic, .. } => info!(
                request_id = %request_id,
                retried,
                heuristic = *heuristic,
                "policy accepted"
            ),
            RepairOutcome::Rejected { kind, detail } => info!(
                request_id = %request_id,
                retried,
                kind = %kind,
                detail = %detail,
                "policy rejected"
            ),
        }

        RepairReport {
            request_id: self.request_id,
            outcome,
            retried,
            fallback_used,
            empty_if_before_fix,
            raw_output: self.raw_output,
            attempts: self.attempts,
        }
    }
}

/// Build the feedback text sent with the single regeneration request.
///
/// The violation kind and detail are embedded verbatim so the generator (and
/// anyone reading its logs) sees exactly which path failed.
pub fn feedback_for(kind: ViolationKind, detail: &str) -> String {
    let hint = match kind {
        ViolationKind::MissingRequiredField => {
            "Include displayName, description, parameters and policyRule (with both if and then) under properties."
        }
        ViolationKind::EmptyRuleBody => {
            "policyRule.if must contain at least one concrete condition on a resource field; an empty allOf or anyOf is not allowed."
        }
        ViolationKind::MalformedEffect => {
            "policyRule.then.effect must be \"[parameters('effect')]\" and parameters must declare effect."
        }
        ViolationKind::UnparsableSource => {
            "Respond with a single complete JSON object and nothing else."
        }
    };
    format!(
        "The previous policy was rejected with {kind}: {detail}\n{hint}\n\
         Return only the corrected policy JSON with a single top-level \"properties\" object."
    )
}

/// The repair orchestrator.
///
/// Construct one engine at startup and share it: it holds no per-request
/// state, so concurrent `repair` calls need no coordination.
pub struct RepairEngine {
    extractor: Box<dyn Extractor>,
    normalizer: Box<dyn Normalizer>,
    guardrail: Box<dyn Guardrail>,
    fallback: Box<dyn FallbackPolicy>,
}

impl RepairEngine {
    /// Create an engine from its four stateless components.
    pub fn new(
        extractor: Box<dyn Extractor>,
        normalizer: Box<dyn Normalizer>,
        guardrail: Box<dyn Guardrail>,
        fallback: Box<dyn FallbackPolicy>,
    ) -> Self {
        Self { extractor, normalizer, guardrail, fallback }
    }

    /// Run Extract → Normalize → Validate once, with no retry or fallback.
    ///
    /// Extraction failures come back as `Invalid(UnparsableSource)` with no
    /// candidate; this never returns an error.
    pub fn check(&self, raw: &str) -> ValidationOutcome {
        let value = match self.extractor.extract(raw) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "no JSON object recovered");
                return ValidationOutcome::unparsable(e.to_string());
            }
        };
        let candidate = self.normalizer.normalize(value);
        self.guardrail.validate(&candidate)
    }

    /// Repair `raw` into an accepted document or a typed rejection.
    ///
    /// `instruction` is only consulted for fallback keyword matching.
    /// `generator` is called at most once.
    pub fn repair(&self, raw: &str, instruction: &str, generator: &dyn Generator) -> RepairReport {
        self.run(raw, instruction, generator, None)
    }

    /// Like `repair`, additionally appending every attempt to `sink`.
    pub fn repair_traced(
        &self,
        raw: &str,
        instruction: &str,
        generator: &dyn Generator,
        sink: &dyn TraceSink,
    ) -> RepairReport {
        self.run(raw, instruction, generator, Some(sink))
    }

    fn run(
        &self,
        raw: &str,
        instruction: &str,
        generator: &dyn Generator,
        sink: Option<&dyn TraceSink>,
    ) -> RepairReport {
        let mut transcript = Transcript::new(sink);
        let request_id = transcript.request_id.0.to_string();
        let mut empty_if_before_fix = false;
        let mut phase = Phase::Initial;

        let outcome = loop {
            phase = match phase {
                // ── Initial: the caller's own text ───────────────────────────
                Phase::Initial => {
                    debug!(request_id = %request_id, raw_len = raw.len(), "initial pass");
                    let outcome = self.check(raw);
                    transcript.record(Stage::Initial, &outcome, Some(raw));

                    match Rejection::from_outcome(outcome) {
                        Err(document) => {
                            break RepairOutcome::Accepted { document, heuristic: false };
                        }
                        Ok(first) => {
                            warn!(
                                request_id = %request_id,
                                kind = %first.kind,
                                detail = %first.detail,
                                "initial pass invalid, requesting regeneration"
                            );
                            empty_if_before_fix = first.kind == ViolationKind::EmptyRuleBody;
                            Phase::RetryOnce { first }
                        }
                    }
                }

                // ── RetryOnce: exactly one regeneration with feedback ────────
                Phase::RetryOnce { first } => {
                    let feedback = feedback_for(first.kind, &first.detail);
                    let (outcome, regenerated) = match generator.generate(&feedback) {
                        Ok(text) => (self.check(&text), Some(text)),
                        Err(e) => {
                            warn!(request_id = %request_id, error = %e, "regeneration failed");
                            (ValidationOutcome::unparsable(format!("regeneration failed: {e}")), None)
                        }
                    };
                    transcript.record(Stage::Retry, &outcome, regenerated.as_deref());

                    match Rejection::from_outcome(outcome) {
                        Err(document) => {
                            break RepairOutcome::Accepted { document, heuristic: false };
                        }
                        Ok(last) => {
                            warn!(
                                request_id = %request_id,
                                kind = %last.kind,
                                detail = %last.detail,
                                "regenerated output still invalid"
                            );
                            Phase::Fallback { first, last }
                        }
                    }
                }

                // ── Fallback: canned rule body or rejection ──────────────────
                Phase::Fallback { first, last } => {
                    break self.fall_back(&request_id, instruction, first, last, &mut transcript);
                }
            };
        };

        transcript.finish(outcome, empty_if_before_fix)
    }

    /// Patch the working candidate from the fallback table, or reject.
    ///
    /// The working candidate is the retry's when it produced one, otherwise
    /// the initial pass's. Rejections report the retry's violation.
    fn fall_back(
        &self,
        request_id: &str,
        instruction: &str,
        first: Rejection,
        last: Rejection,
        transcript: &mut Transcript<'_>,
    ) -> RepairOutcome {
        let reject = |last: Rejection| RepairOutcome::Rejected {
            kind: last.kind,
            detail: last.detail,
        };

        let working = if last.candidate.is_some() { &last } else { &first };
        let candidate = match working.kind {
            ViolationKind::EmptyRuleBody => working.candidate.clone(),
            _ => None,
        };
        let Some(candidate) = candidate else {
            return reject(last);
        };

        let Some(canned) = self.fallback.canned_clause(instruction) else {
            debug!(request_id = %request_id, "no fallback rule matches instruction");
            return reject(last);
        };

        info!(
            request_id = %request_id,
            rule_id = %canned.rule_id,
            "substituting canned rule body"
        );

        let patched = with_rule_body(candidate, canned.clause);
        let patched = self.normalizer.normalize(patched.into_value());
        let outcome = self.guardrail.validate(&patched);
        transcript.record(Stage::Fallback, &outcome, None);

        match outcome {
            ValidationOutcome::Valid { document } => {
                RepairOutcome::Accepted { document, heuristic: true }
            }
            ValidationOutcome::Invalid { kind, detail, .. } => {
                warn!(request_id = %request_id, kind = %kind, "patched candidate still invalid");
                RepairOutcome::Rejected { kind, detail }
            }
        }
    }
}

/// Replace `policyRule.if` with `clause` and make sure `then` references the
/// effect parameter.
fn with_rule_body(mut candidate: PolicyDocument, clause: Value) -> PolicyDocument {
    if let Some(rule) = candidate.policy_rule_mut() {
        rule.insert("if".to_string(), clause);
        match rule.get_mut("then").and_then(Value::as_object_mut) {
            Some(then) => {
                then.entry("effect")
                    .or_insert_with(|| Value::String(EFFECT_TOKEN.to_string()));
            }
            None => {
                let mut then = Map::new();
                then.insert("effect".to_string(), Value::String(EFFECT_TOKEN.to_string()));
                rule.insert("then".to_string(), Value::Object(then));
            }
        }
    }
    candidate
}

// ── Tests ────────────────────────────────────────────────────────────────────
