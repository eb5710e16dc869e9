// src/memory/core/traits.rs

//! Core traits for memory storage and retrieval.
//! All persistence and ranking goes through these — no direct DB calls in
//! agent logic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::core::types::{
    OwnerStats, Page, PageAbstract, RetrievalQuery, RetrievalResult,
};

/// Durable, owner-scoped, transactional storage of the (page, abstract) pair.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Fetch a page by id. No owner check — callers enforce scoping upstream.
    async fn get_page(&self, id: Uuid) -> Result<Option<Page>>;

    /// Bulk fetch. Order is not guaranteed; callers must re-order.
    async fn get_pages(&self, ids: &[Uuid]) -> Result<Vec<Page>>;

    /// Fetch the abstract paired with a page.
    async fn get_abstract(&self, page_id: Uuid) -> Result<Option<PageAbstract>>;

    /// Upsert by id. On conflict, content/token-count/embedding/metadata are
    /// replaced; owner and creation timestamp are preserved.
    async fn store_page(&self, page: &Page) -> Result<()>;

    /// Upsert by page id, replacing summary, headers and summary embedding.
    async fn store_abstract(&self, abstract_record: &PageAbstract) -> Result<()>;

    /// Insert both records inside one transaction; rollback on any failure or
    /// on cancellation. This is the ingest write path.
    async fn store_page_with_abstract(
        &self,
        page: &Page,
        abstract_record: &PageAbstract,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Delete a page; cascades to its abstract.
    async fn delete_page(&self, id: Uuid) -> Result<()>;

    /// Delete all records for an owner.
    async fn delete_owner(&self, owner_id: &str) -> Result<()>;

    /// Delete pages strictly older than `now - max_age`. Returns the count
    /// deleted. Intended for background callers.
    async fn cleanup_expired(&self, max_age: Duration, owner_id: Option<&str>) -> Result<u64>;

    /// Delete pages created strictly before `cutoff`.
    async fn delete_before(&self, cutoff: DateTime<Utc>, owner_id: Option<&str>) -> Result<u64>;

    /// Page count, token sum, and creation-time range for an owner.
    async fn stats(&self, owner_id: &str) -> Result<OwnerStats>;

    /// Most recently created pages for an owner, newest first.
    async fn recent_pages(&self, owner_id: &str, limit: usize) -> Result<Vec<Page>>;
}

/// A ranked page-id search strategy: `(owner, query [, embedding],
/// exclusion set, caps) -> scored results`.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Public retriever name (stable; used for audit and logging)
    fn name(&self) -> &'static str;

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>>;
}
