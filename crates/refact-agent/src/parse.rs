//! Structured data out of LLM free text
//!
//! Models wrap JSON in prose or code fences often enough that the parsers
//! look for the payload before giving up. Anything that still does not
//! deserialize is a `RefactError::Parse`; it is never retried.

use refact_core::{EditSet, Plan, RefactError, Result};
use refact_workspace::validate_path;
use serde::de::DeserializeOwned;

/// Locate the JSON object inside `text`
///
/// Returns the first candidate from [`json_candidates`].
pub fn extract_json(text: &str) -> Option<&str> {
    json_candidates(text).into_iter().next()
}

/// Every plausible JSON object span inside `text`, most specific first
///
/// Tried in order: the whole trimmed text, the first ```json (or bare ```)
/// fenced block closed by the nearest fence, the same block closed by the
/// last fence, and the span from the first `{` to the last `}`. File
/// contents often carry fences of their own, so a short fenced block may
/// be cut mid-string.
fn json_candidates(text: &str) -> Vec<&str> {
    let trimmed = text.trim();
    let mut candidates = Vec::new();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        candidates.push(trimmed);
    }

    if let Some(body) = fenced_body(trimmed) {
        let nearest = body.find("```").map(|end| body[..end].trim());
        let last = body.rfind("```").map(|end| body[..end].trim());
        for block in [nearest, last].into_iter().flatten() {
            if block.starts_with('{') {
                candidates.push(block);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.dedup();
    candidates
}

/// Text after the first opening fence and its info string
fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    let body_start = after_fence.find('\n')? + 1;
    Some(&after_fence[body_start..])
}

/// Deserialize the first candidate that fits `T`
///
/// When none fits, the error from the first candidate is reported.
fn parse_first<T: DeserializeOwned>(raw: &str, what: &str) -> Result<T> {
    let mut first_error = None;
    for candidate in json_candidates(raw) {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    Err(match first_error {
        Some(e) => RefactError::Parse(format!("Invalid {}: {}", what, e)),
        None => RefactError::Parse(format!("No JSON object found in {}", what)),
    })
}

/// Parse the planning reply
pub fn parse_plan(raw: &str) -> Result<Plan> {
    parse_first(raw, "plan")
}

/// Parse the execution reply; every edit path must be a safe workspace path
pub fn parse_edit_set(raw: &str) -> Result<EditSet> {
    let edit_set: EditSet = parse_first(raw, "edit list")?;

    for edit in &edit_set.edits {
        validate_path(edit.path())
            .map_err(|e| RefactError::Parse(format!("Rejected edit: {}", e)))?;
    }

    Ok(edit_set)
}
