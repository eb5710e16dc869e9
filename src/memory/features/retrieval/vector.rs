// src/memory/features/retrieval/vector.rs

//! Cosine-similarity nearest-neighbour over page embeddings.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::memory::core::traits::Retriever;
use crate::memory::core::types::{RetrievalQuery, RetrievalResult};
use crate::memory::storage::postgres::vector_literal;

pub const VECTOR_RETRIEVER: &str = "vector_semantic";

pub struct VectorRetriever {
    pool: PgPool,
}

impl VectorRetriever {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Retriever for VectorRetriever {
    fn name(&self) -> &'static str {
        VECTOR_RETRIEVER
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        let Some(embedding) = query.query_embedding.as_deref() else {
            return Err(MemoryError::InvalidArgument(
                "vector retrieval requires a query embedding".to_string(),
            ));
        };

        let excluded = query.excluded_ids();
        // Pages without an embedding (partial ingest) are skipped.
        let rows = sqlx::query_as::<_, (Uuid, f32)>(
            "SELECT id, (1 - (embedding <=> $1::vector))::float4 AS score
             FROM pages
             WHERE owner_id = $2
               AND embedding IS NOT NULL
               AND NOT (id = ANY($3))
             ORDER BY embedding <=> $1::vector
             LIMIT $4",
        )
        .bind(vector_literal(embedding))
        .bind(&query.owner_id)
        .bind(&excluded)
        .bind(query.max_results as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, score)| *score >= query.min_score)
            .map(|(page_id, score)| RetrievalResult {
                page_id,
                score,
                retriever: VECTOR_RETRIEVER.to_string(),
                matched_header: None,
                snippet: None,
            })
            .collect())
    }
}
