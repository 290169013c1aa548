//! Anthropic API gateway
//!
//! Key design: each call is completely stateless. The gateway never keeps
//! conversation history and never retries; a failed call surfaces as
//! `RefactError::Upstream` carrying the backend's status and body.

use crate::auth;
use crate::types::{
    AnthropicMessage, AnthropicRequest, AnthropicResponse, ChatCompletion, ChatMessage,
    ChatRequest, Choice, CompletionUsage, Model,
};
use async_trait::async_trait;
use refact_core::{RefactError, Result};
use tracing::instrument;

const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: usize = 4000;

/// Outbound chat-completion backend (allows stubbing in tests)
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Proxy a full chat request
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion>;

    /// Send `prompt` as the sole user turn and return the reply
    async fn complete(&self, prompt: &str) -> Result<ChatMessage> {
        let completion = self.chat(ChatRequest::prompt(prompt)).await?;
        completion.message().cloned().ok_or_else(|| RefactError::Upstream {
            status: 200,
            body: "No choices in response".to_string(),
        })
    }
}

/// Gateway to the Anthropic Messages API
#[derive(Debug, Clone)]
pub struct AnthropicGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: Model,
    max_tokens: usize,
}

impl AnthropicGateway {
    /// Create a new gateway against `base_url` (e.g. `https://api.anthropic.com`)
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: Model::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the default model
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Set the token ceiling used when a request does not carry one
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> Model {
        self.model
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    /// Translate an inbound request into the Anthropic wire format
    ///
    /// `system` role messages are folded into the top-level system prompt.
    /// Unknown model names are passed through untouched.
    fn build_request(&self, request: ChatRequest) -> AnthropicRequest {
        let model = match request.model.as_deref() {
            Some(name) => Model::resolve(name)
                .map(|m| m.api_name().to_string())
                .unwrap_or_else(|| name.to_string()),
            None => self.model.api_name().to_string(),
        };

        let mut system_parts: Vec<String> = request.system.into_iter().collect();
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in request.messages {
            if message.role == "system" {
                system_parts.push(message.content);
            } else {
                messages.push(AnthropicMessage {
                    role: message.role,
                    content: message.content,
                });
            }
        }

        AnthropicRequest {
            model,
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            messages,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
        }
    }
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    #[instrument(skip(self, request), fields(messages = request.messages.len()))]
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion> {
        let api_key = auth::resolve_api_key(self.api_key.as_deref())?;
        let body = self.build_request(request);

        tracing::debug!(
            "Sending request to Anthropic API (model {}, max_tokens {})",
            body.model,
            body.max_tokens
        );

        let response = self
            .http
            .post(format!("{}{}", self.base_url, MESSAGES_PATH))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RefactError::transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            tracing::error!("Anthropic API error {}: {}", status, error_text);
            return Err(RefactError::Upstream {
                status: status.as_u16(),
                body: error_text,
            });
        }

        let anthropic_response: AnthropicResponse =
            response.json().await.map_err(|e| RefactError::Upstream {
                status: status.as_u16(),
                body: format!("Failed to parse response: {}", e),
            })?;

        let completion = normalize(anthropic_response);
        tracing::info!(
            "Completion received ({} prompt tokens, {} completion tokens)",
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens
        );
        Ok(completion)
    }
}

/// Convert an Anthropic response into the OpenAI-compatible shape
fn normalize(response: AnthropicResponse) -> ChatCompletion {
    let content = response
        .content
        .iter()
        .filter(|block| block.content_type == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("");

    let usage = response
        .usage
        .map(|u| CompletionUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        })
        .unwrap_or_default();

    ChatCompletion {
        id: response.id,
        object: "chat.completion".to_string(),
        model: response.model,
        choices: vec![Choice {
            index: 0,
            message: ChatMessage::assistant(content),
            finish_reason: response.stop_reason.as_deref().map(finish_reason),
        }],
        usage,
    }
}

fn finish_reason(stop_reason: &str) -> String {
    match stop_reason {
        "end_turn" | "stop_sequence" => "stop",
        "max_tokens" => "length",
        "tool_use" => "tool_calls",
        other => other,
    }
    .to_string()
}
