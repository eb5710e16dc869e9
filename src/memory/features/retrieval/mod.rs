// src/memory/features/retrieval/mod.rs

//! Retrieval strategies over the page store.
//!
//! Each retriever maps `(owner, query [, embedding], exclusion set, caps)` to
//! ranked page-id results. The research loop fans out to whichever subset its
//! plan selects and merges the outputs here.

pub mod header_index;
pub mod keyword;
pub mod vector;

pub use header_index::HeaderIndexRetriever;
pub use keyword::KeywordRetriever;
pub use vector::VectorRetriever;

use std::collections::HashSet;

use crate::memory::core::types::RetrievalResult;

/// Merge fanned-out retriever results: first occurrence per page id wins (no
/// score re-averaging across retrievers), then sort by score descending.
/// The sort is stable, so ties keep their arrival order.
pub fn merge_results(raw: Vec<RetrievalResult>) -> Vec<RetrievalResult> {
    let mut seen_ids = HashSet::new();
    let mut merged: Vec<RetrievalResult> = raw
        .into_iter()
        .filter(|result| seen_ids.insert(result.page_id))
        .collect();
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged
}
