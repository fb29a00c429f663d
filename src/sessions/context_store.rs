use crate::errors::TaskResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Opaque, serializable snapshot of an agent's conversational state.
///
/// The orchestrator never looks inside; only the agent that produced a blob
/// knows how to interpret it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextBlob(serde_json::Value);

impl ContextBlob {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_inner(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for ContextBlob {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// Storage for per-session context blobs.
///
/// Entries are keyed by session id, never by task id, so a session keeps one
/// lineage across the tasks it spans.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Stores `context` for the session, replacing any previous blob.
    async fn save(&self, session_id: &str, context: ContextBlob) -> TaskResult<()>;

    /// Returns the latest blob saved for the session, if any.
    async fn load(&self, session_id: &str) -> TaskResult<Option<ContextBlob>>;

    /// Removes the session's blob. Succeeds silently when there is none.
    async fn clear(&self, session_id: &str) -> TaskResult<()>;
}
