// src/memory/service/mod.rs

//! High-level facade over the memory engine: three verbs — memorize,
//! research, forget. The service is the only caller of the ingest and
//! research agents; it is reentrant across distinct requests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Stream;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;
use crate::llm::{EmbeddingProvider, LlmProvider};
use crate::memory::core::options::ResearchOptions;
use crate::memory::core::traits::{MemoryStore, Retriever};
use crate::memory::core::types::{ConversationTurn, MemoryContext};
use crate::memory::features::ingest::MemoryAgent;
use crate::memory::features::research::{
    ResearchAgent, ResearchQuery, ResearchResources, ResearchStep,
};
use crate::memory::features::retrieval::{HeaderIndexRetriever, KeywordRetriever, VectorRetriever};
use crate::memory::storage::postgres::PostgresMemoryStore;

/// Ingest request: one turn to remember
#[derive(Debug, Clone)]
pub struct MemorizeRequest {
    pub turn: ConversationTurn,
}

/// Recall request
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub owner_id: String,
    pub query: String,
    /// Falls back to the service defaults when unset
    pub options: Option<ResearchOptions>,
}

/// Deletion request. Precedence: `all`, then explicit ids, then `before`.
#[derive(Debug, Clone, Default)]
pub struct ForgetRequest {
    pub owner_id: String,
    pub all: bool,
    pub page_ids: Option<Vec<Uuid>>,
    pub before: Option<DateTime<Utc>>,
}

pub struct MemoryService {
    memory_agent: MemoryAgent,
    research_agent: ResearchAgent,
    store: Arc<dyn MemoryStore>,
    default_options: ResearchOptions,
}

impl MemoryService {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        keyword: Arc<dyn Retriever>,
        vector: Arc<dyn Retriever>,
        index: Arc<dyn Retriever>,
    ) -> Self {
        Self::with_options(
            llm,
            embeddings,
            store,
            keyword,
            vector,
            index,
            ResearchOptions::default(),
        )
    }

    /// Wire the service over a Postgres pool with the stock store and
    /// retrievers. Providers stay injected; they are external collaborators.
    pub fn over_postgres(
        pool: PgPool,
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        default_options: ResearchOptions,
    ) -> Self {
        let store = Arc::new(PostgresMemoryStore::new(pool.clone()));
        Self::with_options(
            llm,
            embeddings,
            store,
            Arc::new(KeywordRetriever::new(pool.clone())),
            Arc::new(VectorRetriever::new(pool.clone())),
            Arc::new(HeaderIndexRetriever::new(pool)),
            default_options,
        )
    }

    pub fn with_options(
        llm: Arc<dyn LlmProvider>,
        embeddings: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn MemoryStore>,
        keyword: Arc<dyn Retriever>,
        vector: Arc<dyn Retriever>,
        index: Arc<dyn Retriever>,
        default_options: ResearchOptions,
    ) -> Self {
        let memory_agent = MemoryAgent::new(llm.clone(), embeddings.clone());
        let research_agent = ResearchAgent::new(ResearchResources {
            llm,
            embeddings,
            store: store.clone(),
            keyword,
            vector,
            index,
        });
        Self {
            memory_agent,
            research_agent,
            store,
            default_options,
        }
    }

    /// Ingest one conversation turn: page + abstract, written atomically.
    pub async fn memorize(
        &self,
        request: MemorizeRequest,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let page = self.memory_agent.create_page(&request.turn, cancel).await?;
        let mut abstract_record = self
            .memory_agent
            .create_abstract(&request.turn, cancel)
            .await?;
        // The page's id is authoritative; rewrite the abstract to reference it.
        abstract_record.page_id = page.id;

        self.store
            .store_page_with_abstract(&page, &abstract_record, cancel)
            .await?;
        info!(owner = %request.turn.owner_id, page_id = %page.id, "memorized turn");
        Ok(())
    }

    /// Assemble a relevance-ordered, token-bounded memory bundle.
    pub async fn research(
        &self,
        request: ResearchRequest,
        cancel: CancellationToken,
    ) -> Result<MemoryContext> {
        let options = request.options.unwrap_or_else(|| self.default_options.clone());
        let query = ResearchQuery {
            owner_id: request.owner_id,
            query: request.query,
        };
        self.research_agent.research(query, options, cancel).await
    }

    /// Streaming research: emits one structured step per loop phase.
    pub fn research_stream(
        &self,
        request: ResearchRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ResearchStep>> + Send + '_ {
        let options = request.options.unwrap_or_else(|| self.default_options.clone());
        let query = ResearchQuery {
            owner_id: request.owner_id,
            query: request.query,
        };
        self.research_agent.research_stream(query, options, cancel)
    }

    /// Drop memories: everything for the owner, an explicit page list, or
    /// everything before a cutoff. Explicit-list deletes are independent; a
    /// failure can leave earlier deletions applied.
    pub async fn forget(&self, request: ForgetRequest, cancel: &CancellationToken) -> Result<()> {
        if request.all {
            self.store.delete_owner(&request.owner_id).await?;
            info!(owner = %request.owner_id, "forgot all memories");
            return Ok(());
        }
        if let Some(page_ids) = &request.page_ids {
            for page_id in page_ids {
                if cancel.is_cancelled() {
                    return Err(crate::error::MemoryError::Cancelled);
                }
                self.store.delete_page(*page_id).await?;
            }
            debug!(owner = %request.owner_id, count = page_ids.len(), "forgot pages by id");
            return Ok(());
        }
        if let Some(before) = request.before {
            let deleted = self.store.delete_before(before, Some(&request.owner_id)).await?;
            debug!(owner = %request.owner_id, deleted, "forgot pages before cutoff");
        }
        Ok(())
    }
}
