use crate::errors::{TaskError, TaskResult};
use a2a_types::{Artifact, Message, Task, TaskState, TaskStatus};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::task_store::TaskStore;

/// In-memory implementation of [`TaskStore`].
///
/// Tasks live in a `DashMap`; every mutation runs while holding the shard
/// lock of its key, which serializes updates per task id while leaving other
/// ids free to proceed. Nothing is persisted: a restart loses every task.
pub struct InMemoryTaskStore {
    tasks: DashMap<String, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Number of tasks held.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_open(task: &Task) -> TaskResult<()> {
    if task.status.state.is_terminal() {
        return Err(TaskError::TaskTerminal {
            task_id: task.id.clone(),
            state: task.status.state,
        });
    }
    Ok(())
}

fn merge_artifact(artifacts: &mut Vec<Artifact>, artifact: Artifact) {
    let Some(existing) = artifacts.iter_mut().find(|a| a.index == artifact.index) else {
        artifacts.push(artifact);
        return;
    };

    if !artifact.append {
        *existing = artifact;
        return;
    }

    existing.parts.extend(artifact.parts);
    if artifact.last_chunk.is_some() {
        existing.last_chunk = artifact.last_chunk;
    }
    if let Some(metadata) = artifact.metadata {
        existing
            .metadata
            .get_or_insert_with(Default::default)
            .extend(metadata);
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, task_id: &str) -> TaskResult<Option<Task>> {
        Ok(self.tasks.get(task_id).map(|task| task.value().clone()))
    }

    async fn upsert(&self, task_id: &str, session_id: &str, message: Message) -> TaskResult<Task> {
        match self.tasks.entry(task_id.to_string()) {
            Entry::Occupied(mut entry) => {
                let task = entry.get_mut();
                ensure_open(task)?;
                task.history.push(message);
                Ok(task.clone())
            }
            Entry::Vacant(entry) => {
                tracing::debug!(task_id, session_id, "creating task");
                let task = Task {
                    id: task_id.to_string(),
                    session_id: session_id.to_string(),
                    status: TaskStatus::new(TaskState::Submitted, None),
                    artifacts: Vec::new(),
                    history: vec![message],
                    metadata: None,
                };
                Ok(entry.insert(task).value().clone())
            }
        }
    }

    async fn update(
        &self,
        task_id: &str,
        status: TaskStatus,
        artifacts: Vec<Artifact>,
    ) -> TaskResult<Task> {
        let mut task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        ensure_open(&task)?;
        if status.state.rank() < task.status.state.rank() {
            return Err(TaskError::internal(
                "task_store",
                format!(
                    "task {task_id} cannot move from {} back to {}",
                    task.status.state, status.state
                ),
            ));
        }

        if let Some(message) = &status.message {
            task.history.push(message.clone());
        }
        task.status = status;
        for artifact in artifacts {
            merge_artifact(&mut task.artifacts, artifact);
        }

        Ok(task.value().clone())
    }

    async fn task_exists(&self, task_id: &str) -> TaskResult<bool> {
        Ok(self.tasks.contains_key(task_id))
    }
}
