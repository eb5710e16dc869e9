// src/config/mod.rs
// Environment-driven configuration for the memory engine

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MemoryError, Result};
use crate::memory::core::options::ResearchOptions;

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn required(key: &str) -> Result<String> {
    var(key).ok_or_else(|| MemoryError::Config(format!("{key} is not set")))
}

/// Read an optional value, falling back to the default when the variable is
/// unset. A value that is set but unparseable is a misconfiguration worth
/// surfacing, so it warns before falling back.
fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    let Some(raw) = var(key) else {
        return default;
    };
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "unparseable configuration value, using default");
            default
        }
    }
}

/// Storage configuration (PostgreSQL + pgvector)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: usize,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("ENGRAM_DATABASE_URL")?,
            max_connections: parsed_or("ENGRAM_DB_MAX_CONNECTIONS", 5),
        })
    }
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dimensions: usize,
}

impl EmbeddingConfig {
    pub fn from_env() -> Self {
        let dimensions = parsed_or("ENGRAM_EMBED_DIMENSIONS", 1536);
        if dimensions == 0 {
            warn!("ENGRAM_EMBED_DIMENSIONS is 0 — vector retrieval will be unusable");
        }
        Self { dimensions }
    }
}

/// Top-level configuration
#[derive(Debug, Clone)]
pub struct EngramConfig {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub research: ResearchOptions,
}

impl EngramConfig {
    /// Load configuration from the environment (reads `.env` if present).
    /// Only the database URL is mandatory; everything else has defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Ok(Self {
            store: StoreConfig::from_env()?,
            embedding: EmbeddingConfig::from_env(),
            research: ResearchOptions {
                max_iterations: parsed_or("ENGRAM_RESEARCH_MAX_ITERATIONS", 5),
                max_pages_per_iteration: parsed_or("ENGRAM_RESEARCH_MAX_PAGES_PER_ITERATION", 10),
                max_context_tokens: parsed_or("ENGRAM_RESEARCH_MAX_CONTEXT_TOKENS", 8000),
                min_relevance_score: parsed_or("ENGRAM_RESEARCH_MIN_RELEVANCE_SCORE", 0.3),
            },
        })
    }
}
