// src/memory/features/ingest/mod.rs

//! Memory agent: converts a conversation turn into a durable (page, abstract)
//! pair. Runs off the user-critical path; the raw content is only indexed,
//! never rewritten.

pub mod abstracts;
pub mod format;

pub use format::{estimate_tokens, format_page_content};

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::llm::{ChatMessage, ChatOptions, EmbeddingProvider, LlmProvider};
use crate::memory::core::types::{ConversationTurn, Page, PageAbstract};

const ABSTRACT_TEMPERATURE: f32 = 0.3;
const ABSTRACT_MAX_TOKENS: u32 = 1000;

pub struct MemoryAgent {
    llm: Arc<dyn LlmProvider>,
    embeddings: Arc<dyn EmbeddingProvider>,
}

impl MemoryAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, embeddings: Arc<dyn EmbeddingProvider>) -> Self {
        Self { llm, embeddings }
    }

    /// Format and embed a turn as a page. The id is fresh; the facade
    /// reconciles it with the abstract before the atomic write.
    pub async fn create_page(
        &self,
        turn: &ConversationTurn,
        cancel: &CancellationToken,
    ) -> Result<Page> {
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let content = format_page_content(turn);
        let token_count = estimate_tokens(&content);
        let embedding = self.embeddings.embed(&content).await?;

        Ok(Page {
            id: Uuid::new_v4(),
            owner_id: turn.owner_id.clone(),
            content,
            token_count,
            embedding: Some(embedding),
            metadata: turn.metadata.clone(),
            created_at: Utc::now(),
        })
    }

    /// Ask the LLM for a summary + headers record and embed the summary.
    /// A response that violates the grammar still yields an abstract, with
    /// empty summary and headers.
    pub async fn create_abstract(
        &self,
        turn: &ConversationTurn,
        cancel: &CancellationToken,
    ) -> Result<PageAbstract> {
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let content = format_page_content(turn);
        let messages = vec![
            ChatMessage::system(abstracts::ABSTRACT_SYSTEM_PROMPT),
            ChatMessage::user(abstracts::abstract_user_prompt(&content)),
        ];
        let options = ChatOptions {
            temperature: ABSTRACT_TEMPERATURE,
            max_tokens: Some(ABSTRACT_MAX_TOKENS),
            model: None,
        };
        let response = self.llm.chat(messages, options).await?;
        let parsed = abstracts::parse_abstract_response(&response.content);
        if parsed.summary.is_empty() {
            warn!(owner = %turn.owner_id, "abstract response had no parseable summary");
        }

        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let summary_embedding = if parsed.summary.is_empty() {
            None
        } else {
            Some(self.embeddings.embed(&parsed.summary).await?)
        };

        debug!(
            owner = %turn.owner_id,
            headers = parsed.headers.len(),
            "created abstract"
        );
        Ok(PageAbstract {
            page_id: Uuid::new_v4(),
            owner_id: turn.owner_id.clone(),
            summary: parsed.summary,
            headers: parsed.headers,
            summary_embedding,
            created_at: Utc::now(),
        })
    }
}
