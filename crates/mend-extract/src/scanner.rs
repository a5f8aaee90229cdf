//! Balanced-object scanner.
//!
//! One pass over the text with a stack of open brackets. A `{` closed by its
//! matching `}` yields a span. A mismatched closer empties the stack, so
//! everything opened before it is dropped. Brackets inside `"..."` are ignored
//! and `\"` does not end a string. Quotes only count once a bracket is open,
//! so prose before the first `{` cannot start a string.
//!
//! Only spans not contained in another closed span are candidates. An outer
//! object that never closes therefore leaves its complete inner objects as
//! candidates.
//!
//! Only ASCII bytes are compared, so every span boundary falls on a UTF-8
//! character boundary.

use serde_json::Value;
use tracing::debug;

use mend_contracts::error::ExtractionError;
use mend_core::traits::Extractor;

/// Recovers the last complete JSON object from free-form text.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExtractor;

impl JsonExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Byte ranges `[start, end)` of every balanced top-level object, in
    /// document order.
    pub fn candidate_spans(text: &str) -> Vec<(usize, usize)> {
        let mut closed = closed_spans(text.as_bytes());

        // Closed spans are nested or disjoint. Sorted by start, and longest
        // first on ties, a span is top-level unless an earlier kept span
        // reaches past its start.
        closed.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut reach = 0;
        for (start, end) in closed {
            if start >= reach {
                spans.push((start, end));
                reach = end;
            }
        }

        spans
    }
}

/// Every `{...}` span closed by its matching `}`, in closing order.
fn closed_spans(bytes: &[u8]) -> Vec<(usize, usize)> {
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut closed = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (idx, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' if !open.is_empty() => in_string = true,
            b'{' | b'[' => open.push((b, idx)),
            b'}' | b']' => match open.pop() {
                Some((b'{', start)) if b == b'}' => closed.push((start, idx + 1)),
                Some((b'[', _)) if b == b']' => {}
                Some(_) => open.clear(),
                None => {}
            },
            _ => {}
        }
    }

    closed
}

impl Extractor for JsonExtractor {
    /// Parse the last balanced candidate.
    ///
    /// Earlier candidates are never consulted: when the last one is not valid
    /// JSON the extraction fails with its parser error.
    fn extract(&self, raw: &str) -> Result<Value, ExtractionError> {
        let spans = Self::candidate_spans(raw);
        let Some(&(start, end)) = spans.last() else {
            return Err(ExtractionError::NoBalancedObject { len: raw.len() });
        };

        match serde_json::from_str::<Value>(&raw[start..end]) {
            Ok(value) => {
                debug!(
                    offset = start,
                    len = end - start,
                    candidates = spans.len(),
                    "extracted JSON object"
                );
                Ok(value)
            }
            Err(e) => {
                debug!(offset = start, error = %e, "last balanced candidate is not valid JSON");
                Err(ExtractionError::InvalidJson { offset: start, reason: e.to_string() })
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
