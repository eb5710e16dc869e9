// src/memory/features/mod.rs

//! Memory features: retrieval strategies, the ingest agent, and the research
//! loop that assembles recall bundles.

pub mod ingest;
pub mod research;
pub mod retrieval;

pub use ingest::MemoryAgent;
pub use research::{ResearchAgent, ResearchQuery, ResearchResources};
pub use retrieval::{HeaderIndexRetriever, KeywordRetriever, VectorRetriever};
