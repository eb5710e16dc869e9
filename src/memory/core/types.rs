// src/memory/core/types.rs

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted memory record: the verbatim formatted text of one conversation
/// turn for one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: Uuid,
    pub owner_id: String,
    pub content: String,
    /// Estimated token count of `content`
    pub token_count: i32,
    /// Dense embedding of `content`; absent during partial ingest
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<HashMap<String, String>>,
    pub created_at: DateTime<Utc>,
}

impl Page {
    pub fn new(owner_id: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let token_count = crate::memory::features::ingest::estimate_tokens(&content);
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            content,
            token_count,
            embedding: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

/// Index-side record paired 1:1 with a page: a short summary, a set of header
/// keywords, and an embedding of the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAbstract {
    /// Shares the page's primary key; deleted with it
    pub page_id: Uuid,
    pub owner_id: String,
    pub summary: String,
    pub headers: Vec<String>,
    pub summary_embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// One tool invocation recorded inside a conversation turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: String,
    pub result: String,
}

/// Ingest input: a single user/assistant exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub owner_id: String,
    pub user_message: String,
    pub assistant_message: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: Option<String>,
    pub turn_number: Option<i32>,
    pub tool_calls: Option<Vec<ToolCallRecord>>,
    pub metadata: Option<HashMap<String, String>>,
}

impl ConversationTurn {
    pub fn new(
        owner_id: impl Into<String>,
        user_message: impl Into<String>,
        assistant_message: impl Into<String>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            user_message: user_message.into(),
            assistant_message: assistant_message.into(),
            timestamp: Utc::now(),
            conversation_id: None,
            turn_number: None,
            tool_calls: None,
            metadata: None,
        }
    }
}

/// Uniform retriever input contract
#[derive(Debug, Clone)]
pub struct RetrievalQuery {
    /// Required scope; memories never cross owner boundaries
    pub owner_id: String,
    pub query: String,
    /// Required only by the vector retriever
    pub query_embedding: Option<Vec<f32>>,
    pub max_results: usize,
    /// Rows scoring strictly below this floor are dropped
    pub min_score: f32,
    pub exclude_page_ids: HashSet<Uuid>,
}

impl RetrievalQuery {
    pub fn new(owner_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            query: query.into(),
            query_embedding: None,
            max_results: 10,
            min_score: 0.0,
            exclude_page_ids: HashSet::new(),
        }
    }

    /// Exclusion set as a plain vec, for SQL array binding
    pub fn excluded_ids(&self) -> Vec<Uuid> {
        self.exclude_page_ids.iter().copied().collect()
    }
}

/// Uniform retriever output: a ranked page-id hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub page_id: Uuid,
    /// Higher is better after per-backend normalization
    pub score: f32,
    /// Name of the retriever that produced this hit
    pub retriever: String,
    pub matched_header: Option<String>,
    pub snippet: Option<String>,
}

/// A hydrated page admitted into a research context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPage {
    pub page_id: Uuid,
    pub content: String,
    pub token_count: i32,
    pub relevance_score: f32,
    /// Retriever whose result admitted this page
    pub retriever: String,
    pub created_at: DateTime<Utc>,
}

/// The immutable bundle returned by a research call: relevance-ordered,
/// token-bounded pages plus loop accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryContext {
    /// Sorted by `relevance_score` descending
    pub pages: Vec<RetrievedPage>,
    pub total_tokens: usize,
    pub iterations_performed: usize,
    pub elapsed: Duration,
}

impl MemoryContext {
    pub fn empty() -> Self {
        Self {
            pages: Vec::new(),
            total_tokens: 0,
            iterations_performed: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Render the bundle into a single prompt-ready block, most relevant
    /// memory first.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, page) in self.pages.iter().enumerate() {
            out.push_str(&format!(
                "--- Memory {} (relevance {:.2}, {}) ---\n",
                i + 1,
                page.relevance_score,
                page.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            ));
            out.push_str(&page.content);
            if !page.content.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

/// Per-owner storage statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerStats {
    pub page_count: i64,
    pub total_tokens: i64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
}
