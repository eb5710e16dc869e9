// src/memory/features/research/steps.rs

//! Structured progress records emitted by the streaming research entry point.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::memory::core::types::{MemoryContext, RetrievalResult};

/// Loop phase. Phases advance strictly Plan -> Search -> Integrate ->
/// Reflect; only a `complete` plan may jump straight to termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResearchPhase {
    Plan,
    Search,
    Integrate,
    Reflect,
}

impl ResearchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchPhase::Plan => "plan",
            ResearchPhase::Search => "search",
            ResearchPhase::Integrate => "integrate",
            ResearchPhase::Reflect => "reflect",
        }
    }
}

impl fmt::Display for ResearchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phase-specific payload attached to a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepPayload {
    Plan { directive: String },
    Search { results: Vec<RetrievalResult> },
    Integrate { pages_added: usize },
    Reflect { continue_research: bool },
}

/// One emitted progress record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchStep {
    /// 1-based loop iteration
    pub iteration: usize,
    pub phase: ResearchPhase,
    /// Human-readable one-liner
    pub summary: String,
    /// Duration of this phase alone
    pub elapsed: Duration,
    pub payload: StepPayload,
    /// Snapshot of the would-be-final context after this phase
    pub current_context: MemoryContext,
}
