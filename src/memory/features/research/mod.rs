// src/memory/features/research/mod.rs

//! Research agent: the iterative plan/search/integrate/reflect loop that
//! assembles a token-bounded memory bundle for a query.
//!
//! The loop is bounded in three dimensions at once: iteration count, token
//! budget, and the reflect gate. Termination is guaranteed by the iteration
//! counter regardless of any other signal.

pub mod plan;
pub mod steps;

pub use plan::{ResearchPlan, parse_plan_response};
pub use steps::{ResearchPhase, ResearchStep, StepPayload};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::{FutureExt, Stream};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MemoryError, Result};
use crate::llm::{ChatMessage, ChatOptions, EmbeddingProvider, LlmProvider};
use crate::memory::core::options::ResearchOptions;
use crate::memory::core::traits::{MemoryStore, Retriever};
use crate::memory::core::types::{
    MemoryContext, RetrievalQuery, RetrievalResult, RetrievedPage,
};
use crate::memory::features::retrieval::merge_results;

/// Reflect hard gate: stop once the context is this full.
const REFLECT_BUDGET_FILL: f64 = 0.9;

const PLAN_MAX_TOKENS: u32 = 300;
const REFLECT_MAX_TOKENS: u32 = 50;

const REFLECT_SYSTEM_PROMPT: &str = "\
You decide whether a memory research loop should keep searching. Reply with
the single word CONTINUE to run another iteration, or DONE to stop.";

fn reflect_user_prompt(ctx: &ResearchContext) -> String {
    format!(
        "Research question: {}\nRecalled {} pages totalling {} tokens (budget {}).\nShould the search continue?",
        ctx.query,
        ctx.pages.len(),
        ctx.total_tokens,
        ctx.options.max_context_tokens,
    )
}

/// An owner-scoped research question.
#[derive(Debug, Clone)]
pub struct ResearchQuery {
    pub owner_id: String,
    pub query: String,
}

/// The explicit capability record the agent runs against. No container, no
/// globals: everything the loop may touch is visible here.
#[derive(Clone)]
pub struct ResearchResources {
    pub llm: Arc<dyn LlmProvider>,
    pub embeddings: Arc<dyn EmbeddingProvider>,
    pub store: Arc<dyn MemoryStore>,
    pub keyword: Arc<dyn Retriever>,
    pub vector: Arc<dyn Retriever>,
    pub index: Arc<dyn Retriever>,
}

/// Loop-internal accumulator, owned by one research call and discarded at
/// return. Callers receive frozen snapshots only.
struct ResearchContext {
    owner_id: String,
    query: String,
    options: ResearchOptions,
    retrieved_ids: HashSet<Uuid>,
    pages: Vec<RetrievedPage>,
    total_tokens: usize,
}

impl ResearchContext {
    fn new(query: &ResearchQuery, options: ResearchOptions) -> Self {
        Self {
            owner_id: query.owner_id.clone(),
            query: query.query.clone(),
            options,
            retrieved_ids: HashSet::new(),
            pages: Vec::new(),
            total_tokens: 0,
        }
    }

    /// Freeze the accumulator into a caller-visible bundle, re-sorted by
    /// relevance.
    fn snapshot(&self, iterations_performed: usize, elapsed: Duration) -> MemoryContext {
        let mut pages = self.pages.clone();
        pages.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        MemoryContext {
            pages,
            total_tokens: self.total_tokens,
            iterations_performed,
            elapsed,
        }
    }
}

pub struct ResearchAgent {
    resources: ResearchResources,
}

impl ResearchAgent {
    pub fn new(resources: ResearchResources) -> Self {
        Self { resources }
    }

    /// Run the loop to completion and return the final bundle. Defined as:
    /// drain the stream, return the context attached to the last step.
    pub async fn research(
        &self,
        query: ResearchQuery,
        options: ResearchOptions,
        cancel: CancellationToken,
    ) -> Result<MemoryContext> {
        let stream = self.research_stream(query, options, cancel);
        tokio::pin!(stream);

        let mut last: Option<ResearchStep> = None;
        while let Some(step) = stream.next().await {
            last = Some(step?);
        }
        Ok(last
            .map(|step| step.current_context)
            .unwrap_or_else(MemoryContext::empty))
    }

    /// Streaming variant: a finite, in-order, non-restartable sequence of
    /// progress records, one per phase.
    pub fn research_stream(
        &self,
        query: ResearchQuery,
        options: ResearchOptions,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<ResearchStep>> + Send + '_ {
        async_stream::stream! {
            let started = Instant::now();
            let mut ctx = ResearchContext::new(&query, options.clone());
            let max_iterations = options.max_iterations.max(1);

            for iteration in 1..=max_iterations {
                if cancel.is_cancelled() {
                    yield Err(MemoryError::Cancelled);
                    return;
                }

                // Plan
                let phase_start = Instant::now();
                let plan = match self.plan(&ctx).await {
                    Ok(plan) => plan,
                    Err(e) => { yield Err(e); return; }
                };
                let complete = plan.complete;
                yield Ok(ResearchStep {
                    iteration,
                    phase: ResearchPhase::Plan,
                    summary: plan.describe(),
                    elapsed: phase_start.elapsed(),
                    payload: StepPayload::Plan { directive: plan.describe() },
                    current_context: ctx.snapshot(iteration, started.elapsed()),
                });
                if complete {
                    debug!(iteration, "planner declared research complete");
                    break;
                }

                // Search
                let phase_start = Instant::now();
                let results = match self.search(&ctx, &plan, &cancel).await {
                    Ok(results) => results,
                    Err(e) => { yield Err(e); return; }
                };
                yield Ok(ResearchStep {
                    iteration,
                    phase: ResearchPhase::Search,
                    summary: format!("{} candidate pages", results.len()),
                    elapsed: phase_start.elapsed(),
                    payload: StepPayload::Search { results: results.clone() },
                    current_context: ctx.snapshot(iteration, started.elapsed()),
                });

                // Integrate
                let phase_start = Instant::now();
                let pages_added = match self.integrate(&mut ctx, &results).await {
                    Ok(added) => added,
                    Err(e) => { yield Err(e); return; }
                };
                yield Ok(ResearchStep {
                    iteration,
                    phase: ResearchPhase::Integrate,
                    summary: format!(
                        "integrated {} pages ({} tokens total)",
                        pages_added, ctx.total_tokens
                    ),
                    elapsed: phase_start.elapsed(),
                    payload: StepPayload::Integrate { pages_added },
                    current_context: ctx.snapshot(iteration, started.elapsed()),
                });

                // Reflect
                let phase_start = Instant::now();
                let continue_research = match self.reflect(&ctx, &cancel).await {
                    Ok(verdict) => verdict,
                    Err(e) => { yield Err(e); return; }
                };
                yield Ok(ResearchStep {
                    iteration,
                    phase: ResearchPhase::Reflect,
                    summary: if continue_research {
                        "continuing research".to_string()
                    } else {
                        "research complete".to_string()
                    },
                    elapsed: phase_start.elapsed(),
                    payload: StepPayload::Reflect { continue_research },
                    current_context: ctx.snapshot(iteration, started.elapsed()),
                });
                if !continue_research {
                    break;
                }
            }

            debug!(
                pages = ctx.pages.len(),
                tokens = ctx.total_tokens,
                "research loop finished"
            );
        }
    }

    /// Plan: ask the LLM for the next directive given the accumulated
    /// context.
    async fn plan(&self, ctx: &ResearchContext) -> Result<ResearchPlan> {
        let messages = vec![
            ChatMessage::system(plan::PLAN_SYSTEM_PROMPT),
            ChatMessage::user(plan::plan_user_prompt(&ctx.query, &ctx.pages)),
        ];
        let response = self
            .resources
            .llm
            .chat(messages, ChatOptions::low_temperature(PLAN_MAX_TOKENS))
            .await?;
        Ok(parse_plan_response(&response.content))
    }

    /// Search: embed the plan query once, fan out to the selected retrievers
    /// concurrently, and merge.
    async fn search(
        &self,
        ctx: &ResearchContext,
        plan: &ResearchPlan,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievalResult>> {
        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let query_embedding = self.resources.embeddings.embed(&plan.search_query).await?;

        let base = RetrievalQuery {
            owner_id: ctx.owner_id.clone(),
            query: plan.search_query.clone(),
            query_embedding: None,
            max_results: ctx.options.max_pages_per_iteration,
            min_score: ctx.options.min_relevance_score,
            exclude_page_ids: ctx.retrieved_ids.clone(),
        };

        fn spawn(
            retriever: Arc<dyn Retriever>,
            query: RetrievalQuery,
        ) -> BoxFuture<'static, Result<Vec<RetrievalResult>>> {
            async move { retriever.retrieve(&query).await }.boxed()
        }

        let mut tasks: Vec<BoxFuture<'static, Result<Vec<RetrievalResult>>>> = Vec::new();
        if plan.use_keyword {
            tasks.push(spawn(self.resources.keyword.clone(), base.clone()));
        }
        if plan.use_vector {
            let mut query = base.clone();
            query.query_embedding = Some(query_embedding.clone());
            tasks.push(spawn(self.resources.vector.clone(), query));
        }
        if plan.use_index && !plan.target_headers.is_empty() {
            for header in &plan.target_headers {
                let mut query = base.clone();
                query.query = header.clone();
                tasks.push(spawn(self.resources.index.clone(), query));
            }
        }
        // Safety net: a plan that schedules nothing still searches.
        if tasks.is_empty() {
            tasks.push(spawn(self.resources.keyword.clone(), base.clone()));
            let mut query = base.clone();
            query.query_embedding = Some(query_embedding.clone());
            tasks.push(spawn(self.resources.vector.clone(), query));
        }

        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let outcomes = futures::future::join_all(tasks).await;
        let mut raw = Vec::new();
        for outcome in outcomes {
            raw.extend(outcome?);
        }
        Ok(merge_results(raw))
    }

    /// Integrate: hydrate fresh hits and admit them greedily, head first,
    /// while they fit the token budget.
    async fn integrate(
        &self,
        ctx: &mut ResearchContext,
        results: &[RetrievalResult],
    ) -> Result<usize> {
        let fresh: Vec<&RetrievalResult> = results
            .iter()
            .filter(|result| !ctx.retrieved_ids.contains(&result.page_id))
            .collect();
        if fresh.is_empty() {
            return Ok(0);
        }

        let ids: Vec<Uuid> = fresh.iter().map(|result| result.page_id).collect();
        let pages = self.resources.store.get_pages(&ids).await?;
        let mut by_id: HashMap<Uuid, _> = pages.into_iter().map(|p| (p.id, p)).collect();

        let mut added = 0;
        for result in fresh {
            // A page deleted mid-request simply drops out.
            let Some(page) = by_id.remove(&result.page_id) else {
                continue;
            };
            let tokens = page.token_count.max(0) as usize;
            if ctx.total_tokens + tokens > ctx.options.max_context_tokens {
                break;
            }
            ctx.total_tokens += tokens;
            ctx.retrieved_ids.insert(page.id);
            ctx.pages.push(RetrievedPage {
                page_id: page.id,
                content: page.content,
                token_count: page.token_count,
                relevance_score: result.score,
                retriever: result.retriever.clone(),
                created_at: page.created_at,
            });
            added += 1;
        }
        Ok(added)
    }

    /// Reflect: hard budget gate, then the force-second-attempt rule, then a
    /// short LLM probe scanned for the CONTINUE token.
    async fn reflect(&self, ctx: &ResearchContext, cancel: &CancellationToken) -> Result<bool> {
        let budget = ctx.options.max_context_tokens as f64;
        if ctx.total_tokens as f64 >= REFLECT_BUDGET_FILL * budget {
            return Ok(false);
        }
        if ctx.pages.is_empty() {
            return Ok(true);
        }

        if cancel.is_cancelled() {
            return Err(MemoryError::Cancelled);
        }
        let messages = vec![
            ChatMessage::system(REFLECT_SYSTEM_PROMPT),
            ChatMessage::user(reflect_user_prompt(ctx)),
        ];
        let response = self
            .resources
            .llm
            .chat(messages, ChatOptions::low_temperature(REFLECT_MAX_TOKENS))
            .await?;
        Ok(response.content.to_uppercase().contains("CONTINUE"))
    }
}
