// src/memory/features/retrieval/keyword.rs

//! Lexical ranking over page content with backend auto-detection.
//!
//! PostgreSQL installations differ in which BM25 extension (if any) is
//! available, so the first retrieval probes the catalog and the choice is
//! cached for the life of the retriever. Raw score conventions differ per
//! backend; everything is normalised to "higher is better" before returning.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::memory::core::traits::Retriever;
use crate::memory::core::types::{RetrievalQuery, RetrievalResult};

pub const KEYWORD_RETRIEVER: &str = "keyword_bm25";

/// Available lexical scoring implementations, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordBackend {
    /// `pg_bm25`: infix `<@>`, raw scores negative (lower = better)
    PgBm25,
    /// ParadeDB `pg_search` (Tantivy): infix `@@@` plus `paradedb.score(id)`
    ParadeDb,
    /// `vchord_bm25`: pre-tokenised `content_bm25` column + `to_bm25query`,
    /// raw scores negative
    VchordBm25,
    /// Native tsvector ranking (tf-idf variant, not true BM25)
    NativeFts,
}

impl KeywordBackend {
    /// Per-result name suffix, so callers can audit which implementation
    /// matched.
    pub fn tag(self) -> &'static str {
        match self {
            KeywordBackend::PgBm25 => "_pg_bm25",
            KeywordBackend::ParadeDb => "_paradedb",
            KeywordBackend::VchordBm25 => "_vchord_bm25",
            KeywordBackend::NativeFts => "_native_fts",
        }
    }
}

pub struct KeywordRetriever {
    pool: PgPool,
    // Sticky per-instance choice; one bad query does not re-trigger detection
    backend: OnceCell<KeywordBackend>,
}

impl KeywordRetriever {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            backend: OnceCell::new(),
        }
    }

    async fn backend(&self) -> KeywordBackend {
        *self
            .backend
            .get_or_init(|| async { Self::detect(&self.pool).await })
            .await
    }

    /// Probe installed extensions in priority order. Detection is
    /// best-effort: a failing catalog query falls through to native FTS.
    async fn detect(pool: &PgPool) -> KeywordBackend {
        let extensions: Vec<(String,)> = sqlx::query_as("SELECT extname FROM pg_extension")
            .fetch_all(pool)
            .await
            .unwrap_or_default();
        let installed = |name: &str| extensions.iter().any(|(ext,)| ext == name);

        let backend = if installed("pg_bm25") {
            KeywordBackend::PgBm25
        } else if installed("pg_search") {
            KeywordBackend::ParadeDb
        } else if installed("vchord_bm25") && Self::has_tokenized_column(pool).await {
            KeywordBackend::VchordBm25
        } else {
            KeywordBackend::NativeFts
        };
        info!(backend = ?backend, "keyword search backend selected");
        backend
    }

    /// vchord_bm25 scores against a pre-built tokenised column; without it
    /// the extension is unusable here.
    async fn has_tokenized_column(pool: &PgPool) -> bool {
        sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM information_schema.columns
             WHERE table_name = 'pages' AND column_name = 'content_bm25'",
        )
        .fetch_optional(pool)
        .await
        .ok()
        .flatten()
        .is_some()
    }

    async fn run_query(
        &self,
        backend: KeywordBackend,
        query: &RetrievalQuery,
    ) -> sqlx::Result<Vec<(Uuid, f32)>> {
        let excluded = query.excluded_ids();
        let limit = query.max_results as i64;
        let sql = match backend {
            // Raw scores are negative (lower = better); negate so the sign
            // matches the shared convention.
            KeywordBackend::PgBm25 => {
                "SELECT id, (-(content <@> $1))::float4 AS score
                 FROM pages
                 WHERE owner_id = $2 AND NOT (id = ANY($3))
                 ORDER BY content <@> $1
                 LIMIT $4"
            }
            KeywordBackend::ParadeDb => {
                "SELECT id, paradedb.score(id)::float4 AS score
                 FROM pages
                 WHERE owner_id = $2 AND NOT (id = ANY($3)) AND content @@@ $1
                 ORDER BY score DESC
                 LIMIT $4"
            }
            KeywordBackend::VchordBm25 => {
                "SELECT id,
                        (-(content_bm25 <&> to_bm25query('pages_content_bm25_idx', $1)))::float4 AS score
                 FROM pages
                 WHERE owner_id = $2 AND NOT (id = ANY($3))
                 ORDER BY content_bm25 <&> to_bm25query('pages_content_bm25_idx', $1)
                 LIMIT $4"
            }
            KeywordBackend::NativeFts => {
                "SELECT id,
                        ts_rank(to_tsvector('english', content),
                                plainto_tsquery('english', $1))::float4 AS score
                 FROM pages
                 WHERE owner_id = $2 AND NOT (id = ANY($3))
                   AND to_tsvector('english', content) @@ plainto_tsquery('english', $1)
                 ORDER BY score DESC
                 LIMIT $4"
            }
        };
        sqlx::query_as::<_, (Uuid, f32)>(sql)
            .bind(&query.query)
            .bind(&query.owner_id)
            .bind(&excluded)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    fn name(&self) -> &'static str {
        KEYWORD_RETRIEVER
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        let backend = self.backend().await;
        let rows = match self.run_query(backend, query).await {
            Ok(rows) => rows,
            Err(e) => {
                // Degraded backend: give the research loop a chance to make
                // progress through the other retrievers. The cached choice
                // stays put.
                warn!(backend = ?backend, error = %e, "keyword query failed, returning no results");
                return Ok(Vec::new());
            }
        };

        let name = format!("{}{}", KEYWORD_RETRIEVER, backend.tag());
        Ok(rows
            .into_iter()
            .filter(|(_, score)| *score >= query.min_score)
            .map(|(page_id, score)| RetrievalResult {
                page_id,
                score,
                retriever: name.clone(),
                matched_header: None,
                snippet: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tags_are_distinct() {
        let tags = [
            KeywordBackend::PgBm25.tag(),
            KeywordBackend::ParadeDb.tag(),
            KeywordBackend::VchordBm25.tag(),
            KeywordBackend::NativeFts.tag(),
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn result_name_carries_backend_suffix() {
        let name = format!("{}{}", KEYWORD_RETRIEVER, KeywordBackend::NativeFts.tag());
        assert_eq!(name, "keyword_bm25_native_fts");
    }
}
