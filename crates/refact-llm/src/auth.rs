//! Authentication for the Anthropic API
//!
//! Supports two sources:
//! 1. An explicitly configured key (config file or `ANTHROPIC_API_KEY` layered by config)
//! 2. `ANTHROPIC_API_KEY` read at call time

use refact_core::{RefactError, Result};
use std::env;

/// Resolve the API key for upstream calls
///
/// Priority:
/// 1. configured key
/// 2. ANTHROPIC_API_KEY
pub fn resolve_api_key(configured: Option<&str>) -> Result<String> {
    if let Some(key) = configured.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    if let Ok(api_key) = env::var("ANTHROPIC_API_KEY") {
        if !api_key.is_empty() {
            tracing::debug!("Using ANTHROPIC_API_KEY from environment");
            return Ok(api_key);
        }
    }

    Err(RefactError::Config(
        "No API key found. Set ANTHROPIC_API_KEY=sk-ant-api03-... or api_key in the config file"
            .to_string(),
    ))
}
