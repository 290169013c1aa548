//! Workspace path validation

use refact_core::{RefactError, Result};

/// Validate that a path is a safe workspace key
///
/// Accepts forward-slash relative paths. Rejects empty paths, absolute
/// paths, `..` segments and empty segments. A leading `./` is stripped.
pub fn validate_path(path: &str) -> Result<String> {
    let trimmed = path.trim();
    let normalized = trimmed.strip_prefix("./").unwrap_or(trimmed);

    if normalized.is_empty() {
        return Err(RefactError::PathValidation("Empty path".to_string()));
    }

    if normalized.starts_with('/') || normalized.starts_with('\\') || has_drive_prefix(normalized)
    {
        return Err(RefactError::PathValidation(format!(
            "Absolute paths not allowed: {}",
            path
        )));
    }

    for segment in normalized.split('/') {
        match segment {
            ".." => {
                return Err(RefactError::PathValidation(format!(
                    "Path traversal not allowed: {}",
                    path
                )))
            }
            "" => {
                return Err(RefactError::PathValidation(format!(
                    "Empty path segment: {}",
                    path
                )))
            }
            _ => {}
        }
    }

    Ok(normalized.to_string())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
