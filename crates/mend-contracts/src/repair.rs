//! Repair request identity, attempt records and terminal outcomes.
//!
//! `RepairOutcome` is what a caller acts on. `RepairReport` wraps it with the
//! metadata a transport layer returns alongside the document: whether a retry
//! happened, whether the heuristic fallback was used, and the ordered list of
//! attempts that led there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{PolicyDocument, ValidationOutcome, ViolationKind};

/// Unique identifier for a single repair request.
///
/// Appears in every log line and trace event the request produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub uuid::Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// The orchestrator state an attempt was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The pipeline run on the caller's raw text.
    Initial,
    /// The single regeneration requested with feedback.
    Retry,
    /// The heuristic substitution of a canned rule body.
    Fallback,
}

/// How a single attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptVerdict {
    Valid,
    Invalid { kind: ViolationKind, detail: String },
}

impl From<&ValidationOutcome> for AttemptVerdict {
    fn from(outcome: &ValidationOutcome) -> Self {
        match outcome {
            ValidationOutcome::Valid { .. } => AttemptVerdict::Valid,
            ValidationOutcome::Invalid { kind, detail, .. } => AttemptVerdict::Invalid {
                kind: *kind,
                detail: detail.clone(),
            },
        }
    }
}

/// One stage of a repair request, as recorded in the report and the trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub stage: Stage,
    pub verdict: AttemptVerdict,
    /// The raw text this attempt parsed. Absent for the fallback stage, which
    /// works on an existing candidate.
    pub raw_output: Option<String>,
    /// Wall-clock time the attempt finished (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Terminal state of the repair orchestrator.
///
/// Callers pattern-match on this:
/// - `Accepted { heuristic: false }` → model output, delivered as is
/// - `Accepted { heuristic: true }` → rule body patched from the fallback table
/// - `Rejected` → surface `kind` and `detail` to the user; never a bare "failed"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RepairOutcome {
    Accepted {
        document: PolicyDocument,
        heuristic: bool,
    },
    Rejected {
        kind: ViolationKind,
        detail: String,
    },
}

impl RepairOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RepairOutcome::Accepted { .. })
    }

    /// The delivered document, if the request was accepted.
    pub fn document(&self) -> Option<&PolicyDocument> {
        match self {
            RepairOutcome::Accepted { document, .. } => Some(document),
            RepairOutcome::Rejected { .. } => None,
        }
    }
}

/// Everything a caller learns about one repair request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub request_id: RequestId,
    pub outcome: RepairOutcome,
    /// True when the generator was asked for a regeneration.
    pub retried: bool,
    /// True when the accepted rule body came from the fallback table.
    pub fallback_used: bool,
    /// True when the initial pass failed with `EmptyRuleBody`.
    pub empty_if_before_fix: bool,
    /// The last raw text the engine parsed.
    pub raw_output: String,
    /// Attempts in the order they were made.
    pub attempts: Vec<AttemptRecord>,
}

/// A fallback-table entry selected for an instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackMatch {
    /// Identifier of the table entry, for logs and reports.
    pub rule_id: String,
    /// The canned `policyRule.if` clause to substitute.
    pub clause: serde_json::Value,
}
