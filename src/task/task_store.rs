use crate::errors::TaskResult;
use a2a_types::{Artifact, Message, Task, TaskStatus};
use async_trait::async_trait;

/// Authoritative storage of tasks.
///
/// Implementations must serialize every read-modify-write on one task id so
/// that concurrent updates never interleave. Different ids may be updated in
/// parallel.
///
/// Terminal states are final: once a task is `completed`, `failed` or
/// `canceled`, both [`TaskStore::upsert`] and [`TaskStore::update`] reject it
/// with [`TaskError::TaskTerminal`](crate::errors::TaskError::TaskTerminal).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Retrieve a task by id.
    async fn get_task(&self, task_id: &str) -> TaskResult<Option<Task>>;

    /// Create the task in `submitted` with `message` as its first history
    /// entry, or append `message` to the history of an existing task.
    async fn upsert(&self, task_id: &str, session_id: &str, message: Message) -> TaskResult<Task>;

    /// The single update path for status and artifacts.
    ///
    /// The status message, if any, is appended to the history. An artifact
    /// flagged `append` extends the stored artifact with the same index;
    /// otherwise it replaces it, or is added when no artifact has that index.
    /// A status that would move the task backwards along
    /// `submitted -> working -> terminal` is rejected.
    async fn update(
        &self,
        task_id: &str,
        status: TaskStatus,
        artifacts: Vec<Artifact>,
    ) -> TaskResult<Task>;

    /// Check if a task exists without retrieving it.
    async fn task_exists(&self, task_id: &str) -> TaskResult<bool> {
        Ok(self.get_task(task_id).await?.is_some())
    }
}
