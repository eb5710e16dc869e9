// src/memory/mod.rs

//! Consolidated memory module
//!
//! - Core: types, traits, and research options
//! - Features: retrieval strategies, ingest agent, research agent
//! - Storage: PostgreSQL backend (pages + abstracts)
//! - Service: high-level facade (memorize / research / forget)

pub mod core;
pub mod features;
pub mod service;
pub mod storage;

// Re-export commonly used items
pub use self::core::{options::ResearchOptions, traits::*, types::*};

pub use self::features::{
    ingest::MemoryAgent,
    research::{
        ResearchAgent, ResearchPhase, ResearchQuery, ResearchResources, ResearchStep, StepPayload,
    },
    retrieval::{HeaderIndexRetriever, KeywordRetriever, VectorRetriever},
};

pub use self::service::{ForgetRequest, MemorizeRequest, MemoryService, ResearchRequest};

pub use self::storage::postgres::PostgresMemoryStore;
