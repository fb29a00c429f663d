//! Session context persistence.
//!
//! A session is a conversation spanning one or more sequential tasks. After a
//! successful turn the agent hands back an opaque [`ContextBlob`], which is
//! stored here under the session id and passed into the next turn of the same
//! session. A failed turn clears the entry so the next turn starts fresh.
//!
//! - `ContextStore`: async abstraction over the storage backend
//! - `InMemoryContextStore`: process-lifetime store with optional LRU bound

pub mod context_store;
pub mod in_memory_context_store;

pub use context_store::{ContextBlob, ContextStore};
pub use in_memory_context_store::InMemoryContextStore;
