//! # taskhub
//!
//! Task lifecycle and streaming manager for agent servers. It sits between the
//! transport and an opaque, slow, fallible [`agents::Agent`] and owns:
//!
//! - task state transitions (`task`)
//! - session context persistence and resumption (`sessions`)
//! - multiplexed streaming of updates to subscribers (`events`)
//! - signed push notifications to verified callback URLs (`push`)
//!
//! The HTTP surface lives in the `taskhub-axum` crate.

pub use a2a_types as a2a;

pub mod agents;
pub mod config;
pub mod errors;
pub mod events;
pub mod push;
pub mod sessions;
pub mod task;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export key task management types for easier access
pub use task::{InMemoryTaskStore, TaskManager, TaskStore};

// Re-export key error types for easier access
pub use errors::{TaskError, TaskResult};
