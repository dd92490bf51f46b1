//! Route handlers.

pub mod completion;
pub mod session;
