// src/memory/core/options.rs

use serde::{Deserialize, Serialize};

/// Per-request knobs for the research loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOptions {
    /// Hard bound on loop iterations; termination is guaranteed by this alone
    pub max_iterations: usize,
    /// Result cap handed to every retriever invocation
    pub max_pages_per_iteration: usize,
    /// Hard cap on the sum of admitted pages' token counts
    pub max_context_tokens: usize,
    /// Score floor handed to every retriever invocation
    pub min_relevance_score: f32,
}

impl Default for ResearchOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5,
            max_pages_per_iteration: 10,
            max_context_tokens: 8000,
            min_relevance_score: 0.3,
        }
    }
}
