//! # refact-llm
//!
//! Anthropic API gateway for refact.
//!
//! Every call is independent and stateless: the prompt is sent as the sole
//! user turn, there is no retry and no streaming. Responses are normalized
//! into the OpenAI-style `{choices: [{message: {role, content}}]}` shape so
//! the HTTP surface can proxy them unchanged.

mod auth;
mod client;
mod mock;
mod types;

pub use auth::resolve_api_key;
pub use client::{AnthropicGateway, LlmGateway};
pub use mock::ScriptedGateway;
pub use types::*;
