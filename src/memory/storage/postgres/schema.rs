// src/memory/storage/postgres/schema.rs

//! Schema for the pages/abstracts pair.
//!
//! The embedding dimension is fixed per installation, so the DDL is rendered
//! with it at migration time. Keyword-search extensions (pg_bm25, pg_search,
//! vchord_bm25) provision their own indexes out of band; the statements here
//! cover everything the native retrievers need.

/// DDL statements, in application order.
pub fn statements(embedding_dimensions: usize) -> Vec<String> {
    let d = embedding_dimensions;
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS pages (
                id UUID PRIMARY KEY,
                owner_id TEXT NOT NULL,
                content TEXT NOT NULL,
                token_count INTEGER NOT NULL DEFAULT 0,
                embedding vector({d}),
                metadata JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS abstracts (
                page_id UUID PRIMARY KEY REFERENCES pages(id) ON DELETE CASCADE,
                owner_id TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                headers TEXT[] NOT NULL DEFAULT '{{}}',
                summary_embedding vector({d}),
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )"
        ),
        "CREATE INDEX IF NOT EXISTS idx_pages_owner ON pages (owner_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_pages_created_at ON pages (created_at DESC)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_pages_embedding ON pages
            USING hnsw (embedding vector_cosine_ops)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_abstracts_owner ON abstracts (owner_id)".to_string(),
        "CREATE INDEX IF NOT EXISTS idx_abstracts_summary_embedding ON abstracts
            USING hnsw (summary_embedding vector_cosine_ops)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_abstracts_headers ON abstracts USING gin (headers)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS idx_pages_content_fts ON pages
            USING gin (to_tsvector('english', content))"
            .to_string(),
    ]
}
