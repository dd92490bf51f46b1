//! Infrastructure layer for Agentry.
//!
//! Implements the ports defined in `agentry-core`: SQLite storage, the
//! AES-256-GCM credential vault, HTTP clients for embeddings, reranking and
//! Pinecone, the built-in tool builders, and the LLM providers.

pub mod config;
pub mod crypto;
pub mod llm;
pub mod retrieval;
pub mod sqlite;
pub mod tools;
