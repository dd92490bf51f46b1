//! Shared domain types for Agentry.
//!
//! This crate contains the domain types used across the workspace: agents and
//! their versioned configs, tool specs and results, credentials, chat
//! sessions, the external event protocol, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod access;
pub mod agent;
pub mod chat;
pub mod config;
pub mod credential;
pub mod error;
pub mod event;
pub mod llm;
pub mod tool;
