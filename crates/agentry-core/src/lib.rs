//! Orchestration core and port definitions for Agentry.
//!
//! This crate defines the "ports" (repository, provider and retrieval
//! traits) that the infrastructure layer implements, together with the tool
//! registry, the run state machine and the completion engine. It depends
//! only on `agentry-types` -- never on `agentry-infra` or any database/IO
//! crate.

pub mod agent;
pub mod chat;
pub mod llm;
pub mod repository;
pub mod service;
pub mod tools;

#[cfg(test)]
mod testing;
