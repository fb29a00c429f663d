use crate::agents::{Agent, AgentRequest, AgentResponse, AgentStreamItem};
use crate::config::TaskHubConfig;
use crate::errors::{TaskError, TaskResult};
use crate::events::{TaskEventBus, TaskSubscription};
use crate::push::{PushNotificationAuth, PushNotifier};
use crate::sessions::{ContextStore, InMemoryContextStore};
use a2a_types::{
    Artifact, FileContent, Message, MessageRole, Part, Task, TaskArtifactUpdateEvent,
    TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams, TaskState,
    TaskStatus, TaskStatusUpdateEvent, TaskStreamEvent,
};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::in_memory_task_store::InMemoryTaskStore;
use super::modality::are_modalities_compatible;
use super::task_store::TaskStore;

/// Orchestrates task lifecycles around an [`Agent`].
///
/// The manager validates requests, keeps the task store authoritative, fans
/// updates out to stream subscribers, resumes session context and fires push
/// notifications on every status transition.
///
/// State flows `submitted -> working -> completed | failed | canceled`. Every
/// transition goes through [`TaskStore::update`], so a task that has reached a
/// terminal state silently absorbs late agent results: they are dropped and
/// the session context is left untouched.
pub struct TaskManager {
    pipeline: Pipeline,
    running: Arc<DashMap<String, RunningStream>>,
    generation: AtomicU64,
}

struct RunningStream {
    generation: u64,
    handle: AbortHandle,
}

/// Everything a background streaming run needs; cheap to clone.
#[derive(Clone)]
struct Pipeline {
    agent: Arc<dyn Agent>,
    store: Arc<dyn TaskStore>,
    contexts: Arc<dyn ContextStore>,
    events: Arc<TaskEventBus>,
    push: Option<Arc<PushNotifier>>,
}

impl TaskManager {
    /// Creates a manager with in-memory stores and push notifications off.
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self {
            pipeline: Pipeline {
                agent,
                store: Arc::new(InMemoryTaskStore::new()),
                contexts: Arc::new(InMemoryContextStore::new()),
                events: Arc::new(TaskEventBus::new()),
                push: None,
            },
            running: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Creates a manager wired according to `config`: bounded context store
    /// and, when enabled, a push notifier with a freshly generated key.
    pub fn from_config(agent: Arc<dyn Agent>, config: &TaskHubConfig) -> TaskResult<Self> {
        config.validate()?;

        let contexts = match config.sessions.capacity() {
            Some(capacity) => InMemoryContextStore::with_capacity(capacity),
            None => InMemoryContextStore::new(),
        };
        let mut manager = Self::new(agent).with_context_store(Arc::new(contexts));

        if config.push.enabled {
            let notifier = PushNotifier::new(
                Arc::new(PushNotificationAuth::generate()),
                config.push.verification_timeout(),
                config.push.delivery_timeout(),
            )?;
            manager = manager.with_push_notifier(Arc::new(notifier));
        }
        Ok(manager)
    }

    pub fn with_task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.pipeline.store = store;
        self
    }

    pub fn with_context_store(mut self, contexts: Arc<dyn ContextStore>) -> Self {
        self.pipeline.contexts = contexts;
        self
    }

    pub fn with_push_notifier(mut self, notifier: Arc<PushNotifier>) -> Self {
        self.pipeline.push = Some(notifier);
        self
    }

    pub fn agent(&self) -> &Arc<dyn Agent> {
        &self.pipeline.agent
    }

    pub fn task_store(&self) -> &Arc<dyn TaskStore> {
        &self.pipeline.store
    }

    pub fn context_store(&self) -> &Arc<dyn ContextStore> {
        &self.pipeline.contexts
    }

    pub fn event_bus(&self) -> &Arc<TaskEventBus> {
        &self.pipeline.events
    }

    pub fn push_notifier(&self) -> Option<&Arc<PushNotifier>> {
        self.pipeline.push.as_ref()
    }

    /// Runs one turn to completion and returns the resulting task.
    ///
    /// Agent failures do not surface as errors: they produce a `failed` task
    /// and clear the session context. Errors are returned only for rejected
    /// requests.
    pub async fn submit(&self, params: TaskSendParams) -> TaskResult<Task> {
        let history_length = params.history_length;
        let (task, request) = self.begin(params).await?;

        let outcome = self.pipeline.run_invoke(&task.id, request).await;
        let task = self.pipeline.settle(&task.id, outcome).await?;
        Ok(with_history_limit(task, history_length))
    }

    /// Starts one turn in the background and returns a subscription to its
    /// updates.
    ///
    /// The subscription sees `working` progress updates, then the artifact,
    /// then exactly one final status update.
    pub async fn submit_streaming(&self, params: TaskSendParams) -> TaskResult<TaskSubscription> {
        let (task, request) = self.begin(params).await?;
        let subscription = self.pipeline.events.subscribe(&task.id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let pipeline = self.pipeline.clone();
        let running = Arc::clone(&self.running);
        let task_id = task.id.clone();

        let join = tokio::spawn(async move {
            // Wait until the abort handle is registered so cancel can find it.
            if ready_rx.await.is_err() {
                return;
            }
            pipeline.run_stream(&task_id, request).await;
            running.remove_if(&task_id, |_, run| run.generation == generation);
        });

        let previous = self.running.insert(
            task.id.clone(),
            RunningStream {
                generation,
                handle: join.abort_handle(),
            },
        );
        // Two requests raced past the check in `begin`: keep one producer.
        if let Some(previous) = previous {
            tracing::warn!(task_id = %task.id, "replacing a concurrent streaming run");
            previous.handle.abort();
        }
        let _ = ready_tx.send(());
        Ok(subscription)
    }

    /// Reattaches to the update stream of an existing task.
    ///
    /// A task that already finished yields its final status update and ends.
    pub async fn resubscribe(&self, params: TaskQueryParams) -> TaskResult<TaskSubscription> {
        if !self.pipeline.store.task_exists(&params.id).await? {
            return Err(TaskError::TaskNotFound { task_id: params.id });
        }
        tracing::debug!(task_id = %params.id, "resubscribing to task");
        Ok(self.pipeline.events.subscribe(&params.id))
    }

    pub async fn get_task(&self, params: TaskQueryParams) -> TaskResult<Task> {
        let task = self.require_task(&params.id).await?;
        Ok(with_history_limit(task, params.history_length))
    }

    /// Moves a running task to `canceled`. Terminal tasks are returned as is.
    pub async fn cancel(&self, params: TaskIdParams) -> TaskResult<Task> {
        let task = self.require_task(&params.id).await?;
        if task.status.state.is_terminal() {
            tracing::debug!(task_id = %task.id, state = %task.status.state, "cancel on finished task ignored");
            return Ok(task);
        }

        let status = TaskStatus::new(
            TaskState::Canceled,
            Some(Message::text(MessageRole::Agent, "Task canceled")),
        );
        match self.pipeline.finish(&params.id, status, Vec::new()).await {
            Ok(task) => {
                if let Some((_, run)) = self.running.remove(&params.id) {
                    run.handle.abort();
                }
                tracing::info!(task_id = %task.id, "task canceled");
                Ok(task)
            }
            Err(error) => self.pipeline.settle(&params.id, Err(error)).await,
        }
    }

    /// Registers a verified callback URL for an existing task.
    pub async fn set_push_notification(
        &self,
        config: TaskPushNotificationConfig,
    ) -> TaskResult<TaskPushNotificationConfig> {
        let notifier = self.require_push()?;
        self.require_task(&config.id).await?;
        let url = &config.push_notification_config.url;
        if url.trim().is_empty() {
            return Err(TaskError::invalid_params("push notification URL is missing"));
        }

        if !notifier
            .register_url(&config.id, config.push_notification_config.clone())
            .await
        {
            return Err(invalid_push_url(url));
        }
        Ok(config)
    }

    pub async fn get_push_notification(
        &self,
        params: TaskIdParams,
    ) -> TaskResult<TaskPushNotificationConfig> {
        let notifier = self.require_push()?;
        self.require_task(&params.id).await?;
        let push_notification_config = notifier.get_config(&params.id).ok_or_else(|| {
            TaskError::invalid_params(format!(
                "no push notification config registered for task {}",
                params.id
            ))
        })?;

        Ok(TaskPushNotificationConfig {
            id: params.id,
            push_notification_config,
        })
    }

    /// Validation, push registration and the `submitted` upsert shared by
    /// both submit paths. Nothing is mutated when validation fails.
    async fn begin(&self, params: TaskSendParams) -> TaskResult<(Task, AgentRequest)> {
        let (query, attachments) = self.validate(&params)?;

        if self.running.contains_key(&params.id) {
            return Err(already_streaming(&params.id));
        }
        if let Some(existing) = self.pipeline.store.get_task(&params.id).await? {
            if existing.status.state.is_terminal() {
                return Err(TaskError::TaskTerminal {
                    task_id: existing.id,
                    state: existing.status.state,
                });
            }
        }

        // Verified up front, bound only once the task has been accepted.
        let push_config = match params.push_notification.clone() {
            Some(config) => {
                let notifier = self.require_push()?;
                if !notifier.verify_url(&config.url).await {
                    return Err(invalid_push_url(&config.url));
                }
                Some((notifier, config))
            }
            None => None,
        };

        let task = self
            .pipeline
            .store
            .upsert(&params.id, &params.session_id, params.message)
            .await?;
        if let Some((notifier, config)) = push_config {
            notifier.bind(&task.id, config);
        }
        tracing::info!(task_id = %task.id, session_id = %task.session_id, "task submitted");
        self.pipeline.notify(&task);

        let prior_context = self.pipeline.contexts.load(&task.session_id).await?;
        let request = AgentRequest::new(query, task.session_id.clone())
            .with_prior_context(prior_context)
            .with_attachments(attachments);
        Ok((task, request))
    }

    fn validate(&self, params: &TaskSendParams) -> TaskResult<(String, Vec<FileContent>)> {
        let supported = self.pipeline.agent.supported_output_modes();
        if !are_modalities_compatible(params.accepted_output_modes.as_deref(), &supported) {
            return Err(TaskError::UnsupportedModality {
                requested: params.accepted_output_modes.clone().unwrap_or_default(),
                supported,
            });
        }

        if let Some(config) = &params.push_notification {
            if config.url.trim().is_empty() {
                return Err(TaskError::invalid_params("push notification URL is missing"));
            }
            self.require_push()?;
        }

        let query = params.message.joined_text();
        let attachments: Vec<FileContent> = params
            .message
            .parts
            .iter()
            .filter_map(Part::as_file)
            .cloned()
            .collect();
        if query.trim().is_empty() && attachments.is_empty() {
            return Err(TaskError::invalid_params(
                "message has neither text nor file parts",
            ));
        }
        Ok((query, attachments))
    }

    async fn require_task(&self, task_id: &str) -> TaskResult<Task> {
        self.pipeline
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| TaskError::TaskNotFound {
                task_id: task_id.to_string(),
            })
    }

    fn require_push(&self) -> TaskResult<&Arc<PushNotifier>> {
        self.pipeline
            .push
            .as_ref()
            .ok_or(TaskError::PushNotificationsDisabled)
    }
}

impl Pipeline {
    fn notify(&self, task: &Task) {
        if let Some(push) = &self.push {
            push.notify(task);
        }
    }

    async fn start(&self, task_id: &str) -> TaskResult<Task> {
        let task = self
            .store
            .update(task_id, TaskStatus::new(TaskState::Working, None), Vec::new())
            .await?;
        self.notify(&task);
        Ok(task)
    }

    async fn progress(&self, task_id: &str, text: String) -> TaskResult<Task> {
        let message = Message::text(MessageRole::Agent, text);
        let task = self
            .store
            .update(
                task_id,
                TaskStatus::new(TaskState::Working, Some(message)),
                Vec::new(),
            )
            .await?;

        self.events
            .publish(TaskStreamEvent::StatusUpdate(TaskStatusUpdateEvent {
                id: task.id.clone(),
                status: task.status.clone(),
                is_final: false,
                metadata: None,
            }));
        self.notify(&task);
        Ok(task)
    }

    /// Terminal transition: artifacts first, then the final status update.
    async fn finish(
        &self,
        task_id: &str,
        status: TaskStatus,
        artifacts: Vec<Artifact>,
    ) -> TaskResult<Task> {
        let task = self.store.update(task_id, status, artifacts.clone()).await?;

        for artifact in artifacts {
            self.events
                .publish(TaskStreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
                    id: task.id.clone(),
                    artifact,
                    metadata: None,
                }));
        }
        self.events
            .publish(TaskStreamEvent::StatusUpdate(TaskStatusUpdateEvent {
                id: task.id.clone(),
                status: task.status.clone(),
                is_final: true,
                metadata: None,
            }));
        self.notify(&task);
        Ok(task)
    }

    async fn complete(
        &self,
        task_id: &str,
        session_id: &str,
        response: AgentResponse,
    ) -> TaskResult<Task> {
        let mut artifact = Artifact::new(0, vec![Part::text(response.text.as_str())]);
        artifact.metadata = response.citation_metadata();

        let task = self
            .finish(
                task_id,
                TaskStatus::new(TaskState::Completed, None),
                vec![artifact],
            )
            .await?;

        if let Err(error) = self.contexts.save(session_id, response.context).await {
            tracing::warn!(task_id, session_id, error = %error, "failed to save session context");
        }
        tracing::info!(task_id, "task completed");
        Ok(task)
    }

    async fn fail(&self, task_id: &str, session_id: &str, error: &TaskError) -> TaskResult<Task> {
        let message = Message::text(MessageRole::Agent, error.to_string());
        let task = self
            .finish(
                task_id,
                TaskStatus::new(TaskState::Failed, Some(message)),
                Vec::new(),
            )
            .await?;

        if let Err(error) = self.contexts.clear(session_id).await {
            tracing::warn!(task_id, session_id, error = %error, "failed to clear session context");
        }
        Ok(task)
    }

    async fn run_invoke(&self, task_id: &str, request: AgentRequest) -> TaskResult<Task> {
        let session_id = request.session_id.clone();
        self.start(task_id).await?;

        match self.agent.invoke(request).await {
            Ok(response) => self.complete(task_id, &session_id, response).await,
            Err(error) => {
                tracing::warn!(task_id, session_id = %session_id, error = %error, "agent invocation failed");
                self.fail(task_id, &session_id, &error).await
            }
        }
    }

    async fn run_stream(&self, task_id: &str, request: AgentRequest) {
        let session_id = request.session_id.clone();
        match self.drive_stream(task_id, request).await {
            Ok(()) => {}
            Err(TaskError::TaskTerminal { state, .. }) => {
                tracing::debug!(task_id, state = %state, "task closed while streaming, dropping agent output");
            }
            Err(error) => {
                tracing::warn!(task_id, session_id = %session_id, error = %error, "streaming agent run failed");
                if let Err(error) = self.fail(task_id, &session_id, &error).await {
                    tracing::debug!(task_id, error = %error, "could not record streaming failure");
                }
            }
        }
    }

    async fn drive_stream(&self, task_id: &str, request: AgentRequest) -> TaskResult<()> {
        let session_id = request.session_id.clone();
        self.start(task_id).await?;

        let mut stream = self.agent.stream(request).await?;
        while let Some(item) = stream.next().await {
            match item? {
                AgentStreamItem::Progress(text) => {
                    self.progress(task_id, text).await?;
                }
                AgentStreamItem::Final(response) => {
                    self.complete(task_id, &session_id, response).await?;
                    return Ok(());
                }
            }
        }
        Err(TaskError::agent("agent stream ended without a final result"))
    }

    /// A terminal task rejecting an update is not an error for the caller:
    /// it gets the task as it stands.
    async fn settle(&self, task_id: &str, outcome: TaskResult<Task>) -> TaskResult<Task> {
        match outcome {
            Err(TaskError::TaskTerminal { state, .. }) => {
                tracing::debug!(task_id, state = %state, "discarding update for finished task");
                self.store
                    .get_task(task_id)
                    .await?
                    .ok_or_else(|| TaskError::TaskNotFound {
                        task_id: task_id.to_string(),
                    })
            }
            other => other,
        }
    }
}

fn already_streaming(task_id: &str) -> TaskError {
    TaskError::invalid_params(format!("task {task_id} is already streaming"))
}

fn invalid_push_url(url: &str) -> TaskError {
    TaskError::InvalidPushUrl {
        url: url.to_string(),
        reason: "the endpoint did not echo the validation token".to_string(),
    }
}

/// Keeps the last `limit` history messages; no limit means no history.
pub fn with_history_limit(mut task: Task, limit: Option<usize>) -> Task {
    match limit {
        Some(limit) if limit > 0 => {
            let skip = task.history.len().saturating_sub(limit);
            task.history.drain(..skip);
        }
        _ => task.history.clear(),
    }
    task
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::ContextBlob;
    use crate::test_support::ScriptedAgent;
    use serde_json::json;

    fn send(task_id: &str, session_id: &str, text: &str) -> TaskSendParams {
        TaskSendParams {
            id: task_id.to_string(),
            session_id: session_id.to_string(),
            message: Message::text(MessageRole::User, text),
            accepted_output_modes: Some(vec!["text".to_string()]),
            push_notification: None,
            history_length: Some(10),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn submit_completes_with_artifact_and_citations() {
        let agent = ScriptedAgent::new();
        agent.push_response(Ok(AgentResponse::new("1 USD = 0.9 EUR [1]", ContextBlob::new(json!({"turn": 1})))
            .with_citation(1, json!("ecb.europa.eu"))));
        let manager = TaskManager::new(Arc::new(agent.clone()));

        let task = manager.submit(send("t1", "s1", "usd to eur?")).await.unwrap();

        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts.len(), 1);
        let artifact = &task.artifacts[0];
        assert_eq!(artifact.index, 0);
        assert!(!artifact.append);
        assert_eq!(artifact.parts[0].as_text(), Some("1 USD = 0.9 EUR [1]"));
        assert_eq!(artifact.metadata.as_ref().unwrap()["1"], json!("ecb.europa.eu"));
        assert_eq!(agent.queries(), vec!["usd to eur?".to_string()]);
    }

    #[tokio::test]
    async fn incompatible_modes_are_rejected_before_creation() {
        let agent = ScriptedAgent::new().with_output_modes(vec!["image/png".to_string()]);
        let manager = TaskManager::new(Arc::new(agent.clone()));
        let mut params = send("t1", "s1", "draw");
        params.accepted_output_modes = Some(vec!["text/plain".to_string()]);

        let err = manager.submit(params).await.unwrap_err();
        assert!(matches!(err, TaskError::UnsupportedModality { .. }));
        assert!(!manager.task_store().task_exists("t1").await.unwrap());
        assert!(agent.prior_contexts().is_empty());
    }

    #[tokio::test]
    async fn agent_failure_fails_task_and_clears_context() {
        let agent = ScriptedAgent::new();
        agent.push_response(Err(TaskError::agent("model timed out")));
        let manager = TaskManager::new(Arc::new(agent));
        manager
            .context_store()
            .save("s1", ContextBlob::new(json!("stale")))
            .await
            .unwrap();

        let task = manager.submit(send("t1", "s1", "hi")).await.unwrap();

        assert_eq!(task.status.state, TaskState::Failed);
        let message = task.status.message.unwrap();
        assert!(message.joined_text().contains("model timed out"));
        assert!(manager.context_store().load("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resubmitting_finished_task_is_rejected() {
        let agent = ScriptedAgent::new();
        agent.push_response(Ok(AgentResponse::new("done", ContextBlob::default())));
        let manager = TaskManager::new(Arc::new(agent));
        manager.submit(send("t1", "s1", "hi")).await.unwrap();

        let err = manager.submit(send("t1", "s1", "again")).await.unwrap_err();
        assert!(matches!(err, TaskError::TaskTerminal { .. }));
    }

    #[tokio::test]
    async fn empty_message_is_invalid() {
        let manager = TaskManager::new(Arc::new(ScriptedAgent::new()));
        let err = manager.submit(send("t1", "s1", "  ")).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidParams { .. }));
    }

    #[tokio::test]
    async fn push_config_requires_notifier_and_url() {
        let manager = TaskManager::new(Arc::new(ScriptedAgent::new()));
        let mut params = send("t1", "s1", "hi");
        params.push_notification = Some(a2a_types::PushNotificationConfig {
            url: String::new(),
            token: None,
            authentication: None,
        });
        let err = manager.submit(params.clone()).await.unwrap_err();
        assert!(matches!(err, TaskError::InvalidParams { .. }));

        params.push_notification.as_mut().unwrap().url = "http://localhost:1/cb".to_string();
        let err = manager.submit(params).await.unwrap_err();
        assert!(matches!(err, TaskError::PushNotificationsDisabled));
        assert!(!manager.task_store().task_exists("t1").await.unwrap());
    }

    #[tokio::test]
    async fn get_task_truncates_history() {
        let agent = ScriptedAgent::new();
        agent.push_response(Ok(AgentResponse::new("done", ContextBlob::default())));
        let manager = TaskManager::new(Arc::new(agent));
        manager.submit(send("t1", "s1", "hi")).await.unwrap();

        let query = |history_length| TaskQueryParams {
            id: "t1".to_string(),
            history_length,
            metadata: None,
        };
        assert!(manager.get_task(query(None)).await.unwrap().history.is_empty());
        assert_eq!(manager.get_task(query(Some(1))).await.unwrap().history.len(), 1);

        let err = manager
            .get_task(TaskQueryParams {
                id: "missing".to_string(),
                history_length: None,
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound { .. }));
    }

    #[tokio::test]
    async fn cancel_unknown_task_is_not_found() {
        let manager = TaskManager::new(Arc::new(ScriptedAgent::new()));
        let err = manager
            .cancel(TaskIdParams {
                id: "nope".to_string(),
                metadata: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::TaskNotFound { .. }));
    }

    #[test]
    fn history_limit_keeps_most_recent() {
        let task = Task {
            id: "t".into(),
            session_id: "s".into(),
            status: TaskStatus::new(TaskState::Working, None),
            artifacts: vec![],
            history: (0..5)
                .map(|i| Message::text(MessageRole::User, i.to_string()))
                .collect(),
            metadata: None,
        };
        let trimmed = with_history_limit(task.clone(), Some(2));
        assert_eq!(trimmed.history[0].joined_text(), "3");
        assert_eq!(with_history_limit(task.clone(), Some(0)).history.len(), 0);
        assert_eq!(with_history_limit(task, Some(50)).history.len(), 5);
    }
}
