//! LLM provider port and model factory.

pub mod factory;
pub mod provider;
