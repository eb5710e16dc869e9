// src/memory/features/research/plan.rs

//! Plan response grammar.
//!
//! The planner replies with line-oriented `FIELD: value` pairs. Prefixes are
//! case-insensitive, unknown lines are ignored, and missing fields take their
//! zero value — except `search_query`, which falls back to a sentinel so the
//! retrievers are never handed an empty query.

use crate::memory::core::types::RetrievedPage;

/// Sentinel used when the planner leaves `SEARCH_QUERY` unset.
pub const DEFAULT_SEARCH_QUERY: &str = "general search";

pub const PLAN_SYSTEM_PROMPT: &str = "\
You direct a memory research loop over a user's stored conversation history.
Given the research question and what has been recalled so far, decide the next
search move. Reply with exactly these fields:

STRATEGY: <one line describing the approach>
SEARCH_QUERY: <optimised query text>
USE_KEYWORD: true|false
USE_VECTOR: true|false
USE_INDEX: true|false
TARGET_HEADERS: <comma-separated headers to look up, or none>
COMPLETE: true|false

Set COMPLETE to true only when the recalled memories already answer the
question.";

pub fn plan_user_prompt(query: &str, pages: &[RetrievedPage]) -> String {
    let mut prompt = format!("Research question: {query}\n\n");
    if pages.is_empty() {
        prompt.push_str("Nothing has been recalled yet.\n");
    } else {
        prompt.push_str(&format!("Recalled so far ({} pages):\n", pages.len()));
        for page in pages.iter().take(10) {
            let preview: String = page.content.chars().take(120).collect();
            prompt.push_str(&format!(
                "- [{:.2}] {}\n",
                page.relevance_score,
                preview.replace('\n', " ")
            ));
        }
    }
    prompt
}

/// One planning directive for a loop iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResearchPlan {
    pub strategy: String,
    pub search_query: String,
    pub use_keyword: bool,
    pub use_vector: bool,
    pub use_index: bool,
    pub target_headers: Vec<String>,
    pub complete: bool,
}

impl ResearchPlan {
    /// Human-readable rendering for step payloads and logs.
    pub fn describe(&self) -> String {
        let strategy = if self.strategy.is_empty() {
            "unspecified strategy"
        } else {
            self.strategy.as_str()
        };
        format!(
            "{} (query: {:?}, keyword: {}, vector: {}, index: {}, complete: {})",
            strategy,
            self.search_query,
            self.use_keyword,
            self.use_vector,
            self.use_index,
            self.complete,
        )
    }
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Parse a plan response field by field.
pub fn parse_plan_response(text: &str) -> ResearchPlan {
    let mut plan = ResearchPlan::default();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match field.trim().to_lowercase().as_str() {
            "strategy" => plan.strategy = value.to_string(),
            "search_query" => plan.search_query = value.to_string(),
            "use_keyword" => plan.use_keyword = parse_bool(value),
            "use_vector" => plan.use_vector = parse_bool(value),
            "use_index" => plan.use_index = parse_bool(value),
            "target_headers" => {
                if !value.eq_ignore_ascii_case("none") {
                    plan.target_headers = value
                        .split(',')
                        .map(str::trim)
                        .filter(|h| !h.is_empty())
                        .map(str::to_string)
                        .collect();
                }
            }
            "complete" => plan.complete = parse_bool(value),
            _ => {}
        }
    }

    if plan.search_query.is_empty() {
        plan.search_query = DEFAULT_SEARCH_QUERY.to_string();
    }
    plan
}
