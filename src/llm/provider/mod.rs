// src/llm/provider/mod.rs
// LLM provider trait - completion providers are external collaborators

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Message role across all providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Simple message format for all providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call completion options
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

impl ChatOptions {
    pub fn low_temperature(max_tokens: u32) -> Self {
        Self {
            temperature: 0.2,
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }
}

/// Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub model: String,
}

/// Universal LLM provider interface
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Single-shot chat completion
    async fn chat(&self, messages: Vec<ChatMessage>, options: ChatOptions) -> Result<ChatResponse>;

    /// Streaming chat completion yielding content chunks
    async fn stream_chat(
        &self,
        _messages: Vec<ChatMessage>,
        _options: ChatOptions,
    ) -> Result<Box<dyn Stream<Item = Result<String>> + Send + Unpin>> {
        Err(crate::error::MemoryError::Llm(format!(
            "{} does not support streaming",
            self.name()
        )))
    }
}
