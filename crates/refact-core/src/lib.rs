//! # refact-core
//!
//! Core types for the refact agent service.
//!
//! The service fronts an LLM chat API and runs a small coding agent against
//! in-memory project workspaces that are mirrored to hosted repositories.
//!
//! ## Core Paradigm
//!
//! - A workspace is a flat map of relative path to file content
//! - Every change to a workspace is an [`Edit`]
//! - The agent plans with one LLM call and edits with a second
//! - Remote mirroring is best-effort, one commit per edited file

mod config;
mod error;
mod types;

pub use config::{DatabaseConfig, Provider, ServerConfig};
pub use error::{RefactError, Result};
pub use types::*;
