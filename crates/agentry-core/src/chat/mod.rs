//! Conversation store port.

pub mod repository;
