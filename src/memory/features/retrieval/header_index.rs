// src/memory/features/retrieval/header_index.rs

//! Substring match over the headers array of abstracts.
//!
//! A header hit is deterministic, not a similarity, so every result scores a
//! fixed 1.0 and carries the first matching header.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::memory::core::traits::Retriever;
use crate::memory::core::types::{RetrievalQuery, RetrievalResult};

pub const HEADER_INDEX_RETRIEVER: &str = "page_index";

const HEADER_MATCH_SCORE: f32 = 1.0;

pub struct HeaderIndexRetriever {
    pool: PgPool,
}

impl HeaderIndexRetriever {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Escape LIKE metacharacters so the query text matches literally.
    fn like_pattern(query: &str) -> String {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    }
}

#[async_trait]
impl Retriever for HeaderIndexRetriever {
    fn name(&self) -> &'static str {
        HEADER_INDEX_RETRIEVER
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        let excluded = query.excluded_ids();
        let rows = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT DISTINCT ON (a.page_id) a.page_id, h.header
             FROM abstracts a
             CROSS JOIN LATERAL unnest(a.headers) WITH ORDINALITY AS h(header, pos)
             WHERE a.owner_id = $1
               AND NOT (a.page_id = ANY($2))
               AND h.header ILIKE $3
             ORDER BY a.page_id, h.pos
             LIMIT $4",
        )
        .bind(&query.owner_id)
        .bind(&excluded)
        .bind(Self::like_pattern(&query.query))
        .bind(query.max_results as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|_| HEADER_MATCH_SCORE >= query.min_score)
            .map(|(page_id, header)| RetrievalResult {
                page_id,
                score: HEADER_MATCH_SCORE,
                retriever: HEADER_INDEX_RETRIEVER.to_string(),
                matched_header: Some(header),
                snippet: None,
            })
            .collect())
    }
}
