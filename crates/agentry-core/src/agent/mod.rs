//! Agent runs: the executor loop, the run state machine and the
//! orchestration engine that ties them to storage.

pub mod engine;
pub mod executor;
pub mod records;
pub mod state;
pub mod template;
