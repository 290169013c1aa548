//! # refact-agent
//!
//! Minimal coding agent for refact workspaces.
//!
//! This crate provides:
//! - The tool set the agent gathers context with
//! - Prompt templates for the planning and execution calls
//! - Lenient parsing of structured data out of LLM free text
//! - The plan → gather → execute → apply workflow
//!
//! The workflow is a plain async function. Every collaborator (workspace
//! store, LLM gateway, web fetcher, remote sync) is passed in explicitly.

mod parse;
mod prompt;
mod state_machine;
mod tools;
mod web;
mod workflow;

pub use parse::{extract_json, parse_edit_set, parse_plan};
pub use prompt::{build_execution_prompt, build_planning_prompt, build_think_prompt};
pub use state_machine::{transition, Action, Event, State};
pub use tools::{Tool, ToolOutput, ToolSet};
pub use web::{extract_text, fetch_page_text, HttpFetcher, StaticFetcher, WebFetcher, WEB_CHAR_BUDGET};
pub use workflow::{mirror_edits, run_workflow, ContextEntry, GatheredContext};
