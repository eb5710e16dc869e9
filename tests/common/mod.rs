// tests/common/mod.rs
// Shared doubles for exercising the ingest and research paths without a
// database or live providers.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use engram::error::{MemoryError, Result};
use engram::llm::{ChatMessage, ChatOptions, ChatResponse, EmbeddingProvider, LlmProvider};
use engram::memory::{
    MemoryStore, OwnerStats, Page, PageAbstract, RetrievalQuery, RetrievalResult, Retriever,
};

/// Install the test logging subscriber. Uses `try_init` so repeated calls
/// across tests are no-ops; run with `--nocapture` to see the output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// ============================================================================
// LLM double
// ============================================================================

/// Replays a fixed response script in call order. Once the script runs dry it
/// answers `COMPLETE: true`, which ends a plan phase and reads as "stop" to a
/// reflect probe.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(
        &self,
        _messages: Vec<ChatMessage>,
        _options: ChatOptions,
    ) -> Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "COMPLETE: true".to_string());
        Ok(ChatResponse {
            content,
            prompt_tokens: 0,
            completion_tokens: 0,
            model: "scripted".to_string(),
        })
    }
}

// ============================================================================
// Embedding double
// ============================================================================

/// Deterministic toy embeddings: the test retrievers score by term overlap,
/// so the vectors only need to exist and be stable.
pub struct HashEmbeddings;

#[async_trait]
impl EmbeddingProvider for HashEmbeddings {
    fn dimensions(&self) -> usize {
        8
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            v[i % 8] += byte as f32;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            v[0] = 1.0;
        }
        Ok(v)
    }
}

// ============================================================================
// Store double
// ============================================================================

struct StoredRecord {
    page: Page,
    abstract_record: Option<PageAbstract>,
}

/// In-memory stand-in for the Postgres store, mimicking its contract:
/// upsert preserves owner and creation timestamp, page deletion cascades,
/// the paired write is all-or-nothing under cancellation.
pub struct InMemoryStore {
    records: RwLock<HashMap<Uuid, StoredRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(HashMap::new()),
        })
    }

    /// Seed a page (and optional abstract) directly, bypassing the agents.
    pub fn seed(&self, page: Page, abstract_record: Option<PageAbstract>) {
        self.records.write().unwrap().insert(
            page.id,
            StoredRecord {
                page,
                abstract_record,
            },
        );
    }

    pub fn pages_for_owner(&self, owner_id: &str) -> Vec<Page> {
        self.records
            .read()
            .unwrap()
            .values()
            .filter(|r| r.page.owner_id == owner_id)
            .map(|r| r.page.clone())
            .collect()
    }

    pub fn abstracts_for_owner(&self, owner_id: &str) -> Vec<PageAbstract> {
        self.records
            .read()
            .unwrap()
            .values()
            .filter_map(|r| r.abstract_record.clone())
            .filter(|a| a.owner_id == owner_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_page(&self, id: Uuid) -> Result<Option<Page>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .get(&id)
            .map(|r| r.page.clone()))
    }

    async fn get_pages(&self, ids: &[Uuid]) -> Result<Vec<Page>> {
        let records = self.records.read().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(id).map(|r| r.page.clone()))
            .collect())
    }

    async fn get_abstract(&self, page_id: Uuid) -> Result<Option<PageAbstract>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .get(&page_id)
            .and_then(|r| r.abstract_record.clone()))
    }

    async fn store_page(&self, page: &Page) -> Result<()> {
        let mut records = self.records.write().unwrap();
        match records.get_mut(&page.id) {
            Some(existing) => {
                // owner and created_at are preserved on conflict
                existing.page.content = page.content.clone();
                existing.page.token_count = page.token_count;
                existing.page.embedding = page.embedding.clone();
                existing.page.metadata = page.metadata.clone();
            }
            None => {
                records.insert(
                    page.id,
                    StoredRecord {
                        page: page.clone(),
                        abstract_record: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn store_abstract(&self, record: &PageAbstract) -> Result<()> {
        let mut records = self.records.write().unwrap();
        match records.get_mut(&record.page_id) {
            Some(existing) => {
                existing.abstract_record = Some(record.clone());
                Ok(())
            }
            None => Err(MemoryError::NotFound(format!(
                "page {} has no row to attach an abstract to",
                record.page_id
            ))),
        }
    }

    async fn store_page_with_abstract(
        &self,
        page: &Page,
        record: &PageAbstract,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        self.store_page(page).await?;
        self.store_abstract(record).await
    }

    async fn delete_page(&self, id: Uuid) -> Result<()> {
        self.records.write().unwrap().remove(&id);
        Ok(())
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .retain(|_, r| r.page.owner_id != owner_id);
        Ok(())
    }

    async fn cleanup_expired(&self, max_age: Duration, owner_id: Option<&str>) -> Result<u64> {
        self.delete_before(Utc::now() - max_age, owner_id).await
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>, owner_id: Option<&str>) -> Result<u64> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|_, r| {
            let owner_match = owner_id.map_or(true, |o| r.page.owner_id == o);
            !(owner_match && r.page.created_at < cutoff)
        });
        Ok((before - records.len()) as u64)
    }

    async fn stats(&self, owner_id: &str) -> Result<OwnerStats> {
        let pages = self.pages_for_owner(owner_id);
        Ok(OwnerStats {
            page_count: pages.len() as i64,
            total_tokens: pages.iter().map(|p| p.token_count as i64).sum(),
            oldest: pages.iter().map(|p| p.created_at).min(),
            newest: pages.iter().map(|p| p.created_at).max(),
        })
    }

    async fn recent_pages(&self, owner_id: &str, limit: usize) -> Result<Vec<Page>> {
        let mut pages = self.pages_for_owner(owner_id);
        pages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        pages.truncate(limit);
        Ok(pages)
    }
}

// ============================================================================
// Retriever doubles
// ============================================================================

fn overlap_score(query: &str, content: &str) -> f32 {
    let content = content.to_lowercase();
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if terms.is_empty() {
        return 0.0;
    }
    let matched = terms.iter().filter(|t| content.contains(t.as_str())).count();
    matched as f32 / terms.len() as f32
}

fn rank_and_cap(mut hits: Vec<RetrievalResult>, query: &RetrievalQuery) -> Vec<RetrievalResult> {
    hits.retain(|h| h.score >= query.min_score);
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    hits.truncate(query.max_results);
    hits
}

/// Keyword stand-in: term overlap over page content.
pub struct KeywordStub {
    store: Arc<InMemoryStore>,
}

impl KeywordStub {
    pub fn new(store: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

#[async_trait]
impl Retriever for KeywordStub {
    fn name(&self) -> &'static str {
        "keyword_bm25"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        let hits = self
            .store
            .pages_for_owner(&query.owner_id)
            .into_iter()
            .filter(|p| !query.exclude_page_ids.contains(&p.id))
            .map(|p| RetrievalResult {
                page_id: p.id,
                score: overlap_score(&query.query, &p.content),
                retriever: self.name().to_string(),
                matched_header: None,
                snippet: None,
            })
            .collect();
        Ok(rank_and_cap(hits, query))
    }
}

/// Vector stand-in: enforces the query-embedding contract, skips pages
/// without embeddings, scores by term overlap for determinism.
pub struct VectorStub {
    store: Arc<InMemoryStore>,
}

impl VectorStub {
    pub fn new(store: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

#[async_trait]
impl Retriever for VectorStub {
    fn name(&self) -> &'static str {
        "vector_semantic"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        if query.query_embedding.is_none() {
            return Err(MemoryError::InvalidArgument(
                "vector retrieval requires a query embedding".to_string(),
            ));
        }
        let hits = self
            .store
            .pages_for_owner(&query.owner_id)
            .into_iter()
            .filter(|p| p.embedding.is_some())
            .filter(|p| !query.exclude_page_ids.contains(&p.id))
            .map(|p| RetrievalResult {
                page_id: p.id,
                score: overlap_score(&query.query, &p.content),
                retriever: self.name().to_string(),
                matched_header: None,
                snippet: None,
            })
            .collect();
        Ok(rank_and_cap(hits, query))
    }
}

/// Header-index stand-in: case-insensitive substring over abstract headers,
/// fixed 1.0 score, first matching header attached.
pub struct HeaderIndexStub {
    store: Arc<InMemoryStore>,
}

impl HeaderIndexStub {
    pub fn new(store: Arc<InMemoryStore>) -> Arc<Self> {
        Arc::new(Self { store })
    }
}

#[async_trait]
impl Retriever for HeaderIndexStub {
    fn name(&self) -> &'static str {
        "page_index"
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        let needle = query.query.to_lowercase();
        let hits = self
            .store
            .abstracts_for_owner(&query.owner_id)
            .into_iter()
            .filter(|a| !query.exclude_page_ids.contains(&a.page_id))
            .filter_map(|a| {
                a.headers
                    .iter()
                    .find(|h| h.to_lowercase().contains(&needle))
                    .map(|h| RetrievalResult {
                        page_id: a.page_id,
                        score: 1.0,
                        retriever: self.name().to_string(),
                        matched_header: Some(h.clone()),
                        snippet: None,
                    })
            })
            .collect();
        Ok(rank_and_cap(hits, query))
    }
}

/// A degraded backend that recovered by returning nothing.
pub struct EmptyRetriever {
    name: &'static str,
}

impl EmptyRetriever {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name })
    }
}

#[async_trait]
impl Retriever for EmptyRetriever {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn retrieve(&self, _query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        Ok(Vec::new())
    }
}

/// Wraps a retriever and counts invocations.
pub struct CountingRetriever {
    inner: Arc<dyn Retriever>,
    calls: AtomicUsize,
}

impl CountingRetriever {
    pub fn new(inner: Arc<dyn Retriever>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for CountingRetriever {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn retrieve(&self, query: &RetrievalQuery) -> Result<Vec<RetrievalResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.retrieve(query).await
    }
}
