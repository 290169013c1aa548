//! Scripted gateway for tests

use crate::client::LlmGateway;
use crate::types::{ChatCompletion, ChatMessage, ChatRequest, Choice, CompletionUsage};
use async_trait::async_trait;
use refact_core::{RefactError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Gateway that replays queued replies in order and records every request
///
/// Once the queue is empty every call fails with an upstream error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<VecDeque<Result<String>>>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.lock_replies().push_back(Ok(content.into()));
        self
    }

    /// Queue an upstream failure
    pub fn fail(self, status: u16, body: impl Into<String>) -> Self {
        self.lock_replies().push_back(Err(RefactError::Upstream {
            status,
            body: body.into(),
        }));
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Text of the last user turn of each request
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| "scripted".to_string());
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        let content = self.lock_replies().pop_front().unwrap_or_else(|| {
            Err(RefactError::Upstream {
                status: 500,
                body: "No scripted reply left".to_string(),
            })
        })?;

        Ok(ChatCompletion {
            id: "scripted".to_string(),
            object: "chat.completion".to_string(),
            model,
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::assistant(content),
                finish_reason: Some("stop".to_string()),
            }],
            usage: CompletionUsage::default(),
        })
    }
}
