// src/memory/storage/postgres/store.rs

//! CRUD and transactional write paths for the (page, abstract) pair.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::{parse_vector, vector_literal};
use crate::error::{MemoryError, Result};
use crate::memory::core::traits::MemoryStore;
use crate::memory::core::types::{OwnerStats, Page, PageAbstract};

/// PostgreSQL-backed memory store
#[derive(Clone)]
pub struct PostgresMemoryStore {
    pool: PgPool,
}

const PAGE_COLUMNS: &str =
    "id, owner_id, content, token_count, embedding::text AS embedding, metadata, created_at";

const ABSTRACT_COLUMNS: &str = "page_id, owner_id, summary, headers, \
     summary_embedding::text AS summary_embedding, created_at";

impl PostgresMemoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the schema. Idempotent; safe to call at startup.
    pub async fn migrate(&self, embedding_dimensions: usize) -> Result<()> {
        for statement in super::schema::statements(embedding_dimensions) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        debug!("schema migration applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn page_from_row(row: &PgRow) -> Result<Page> {
        let embedding: Option<String> = row.get("embedding");
        let metadata: Option<serde_json::Value> = row.get("metadata");
        let metadata: Option<HashMap<String, String>> = metadata
            .map(serde_json::from_value)
            .transpose()
            .unwrap_or(None);
        Ok(Page {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            content: row.get("content"),
            token_count: row.get("token_count"),
            embedding: embedding.as_deref().and_then(parse_vector),
            metadata,
            created_at: row.get("created_at"),
        })
    }

    fn abstract_from_row(row: &PgRow) -> PageAbstract {
        let summary_embedding: Option<String> = row.get("summary_embedding");
        PageAbstract {
            page_id: row.get("page_id"),
            owner_id: row.get("owner_id"),
            summary: row.get("summary"),
            headers: row.get("headers"),
            summary_embedding: summary_embedding.as_deref().and_then(parse_vector),
            created_at: row.get("created_at"),
        }
    }

    async fn upsert_page<'e, E>(executor: E, page: &Page) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let metadata = page
            .metadata
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        // owner_id and created_at are immutable: omitted from the update set
        sqlx::query(
            "INSERT INTO pages (id, owner_id, content, token_count, embedding, metadata, created_at)
             VALUES ($1, $2, $3, $4, $5::vector, $6, $7)
             ON CONFLICT (id) DO UPDATE SET
                 content = EXCLUDED.content,
                 token_count = EXCLUDED.token_count,
                 embedding = EXCLUDED.embedding,
                 metadata = EXCLUDED.metadata",
        )
        .bind(page.id)
        .bind(&page.owner_id)
        .bind(&page.content)
        .bind(page.token_count)
        .bind(page.embedding.as_deref().map(vector_literal))
        .bind(metadata)
        .bind(page.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    async fn upsert_abstract<'e, E>(executor: E, record: &PageAbstract) -> Result<()>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query(
            "INSERT INTO abstracts (page_id, owner_id, summary, headers, summary_embedding, created_at)
             VALUES ($1, $2, $3, $4, $5::vector, $6)
             ON CONFLICT (page_id) DO UPDATE SET
                 summary = EXCLUDED.summary,
                 headers = EXCLUDED.headers,
                 summary_embedding = EXCLUDED.summary_embedding",
        )
        .bind(record.page_id)
        .bind(&record.owner_id)
        .bind(&record.summary)
        .bind(&record.headers)
        .bind(record.summary_embedding.as_deref().map(vector_literal))
        .bind(record.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for PostgresMemoryStore {
    async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::page_from_row).transpose()
    }

    async fn get_pages(&self, ids: &[Uuid]) -> Result<Vec<Page>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::page_from_row).collect()
    }

    async fn get_abstract(&self, page_id: Uuid) -> Result<Option<PageAbstract>> {
        let row = sqlx::query(&format!(
            "SELECT {ABSTRACT_COLUMNS} FROM abstracts WHERE page_id = $1"
        ))
        .bind(page_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(Self::abstract_from_row))
    }

    async fn store_page(&self, page: &Page) -> Result<()> {
        Self::upsert_page(&self.pool, page).await
    }

    async fn store_abstract(&self, record: &PageAbstract) -> Result<()> {
        Self::upsert_abstract(&self.pool, record).await
    }

    async fn store_page_with_abstract(
        &self,
        page: &Page,
        record: &PageAbstract,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::upsert_page(&mut *tx, page).await?;
        Self::upsert_abstract(&mut *tx, record).await?;
        if cancel.is_cancelled() {
            // dropping the transaction rolls it back
            return Err(MemoryError::Cancelled);
        }
        tx.commit().await?;
        debug!(page_id = %page.id, owner = %page.owner_id, "stored page with abstract");
        Ok(())
    }

    async fn delete_page(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM pages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM pages WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        debug!(owner = owner_id, count = result.rows_affected(), "deleted owner pages");
        Ok(())
    }

    async fn cleanup_expired(&self, max_age: Duration, owner_id: Option<&str>) -> Result<u64> {
        let cutoff = Utc::now() - max_age;
        self.delete_before(cutoff, owner_id).await
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>, owner_id: Option<&str>) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM pages
             WHERE created_at < $1 AND ($2::text IS NULL OR owner_id = $2)",
        )
        .bind(cutoff)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, owner_id: &str) -> Result<OwnerStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS page_count,
                    COALESCE(SUM(token_count), 0)::bigint AS total_tokens,
                    MIN(created_at) AS oldest,
                    MAX(created_at) AS newest
             FROM pages WHERE owner_id = $1",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(OwnerStats {
            page_count: row.get("page_count"),
            total_tokens: row.get("total_tokens"),
            oldest: row.get("oldest"),
            newest: row.get("newest"),
        })
    }

    async fn recent_pages(&self, owner_id: &str, limit: usize) -> Result<Vec<Page>> {
        let rows = sqlx::query(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages
             WHERE owner_id = $1
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::page_from_row).collect()
    }
}
