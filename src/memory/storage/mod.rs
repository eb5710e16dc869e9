// src/memory/storage/mod.rs

//! Storage backends for the memory system.
//!
//! PostgreSQL (with pgvector) holds both the structured records and the
//! vector columns the retrievers rank over.

pub mod postgres;

pub use postgres::PostgresMemoryStore;
