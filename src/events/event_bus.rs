//! Per-task fan-out for streaming updates.
//!
//! Every task owns one logical stream. Subscribers only see events published
//! after they subscribed. Publishing happens while holding the task's map
//! entry, so every subscriber observes the same total order. The final status
//! event closes the stream: it is kept so that a subscriber arriving after
//! termination still receives it, and anything published afterwards is
//! dropped.

use a2a_types::TaskStreamEvent;
use dashmap::DashMap;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

type TaskId = String;

#[derive(Default)]
struct Subscribers {
    senders: Vec<UnboundedSender<TaskStreamEvent>>,
    terminal: Option<TaskStreamEvent>,
}

impl Subscribers {
    fn add(&mut self, sender: UnboundedSender<TaskStreamEvent>) {
        match &self.terminal {
            // Dropping `sender` right after closes the receiver behind the
            // replayed event.
            Some(terminal) => {
                let _ = sender.send(terminal.clone());
            }
            None => self.senders.push(sender),
        }
    }

    fn broadcast(&mut self, event: &TaskStreamEvent) {
        self.senders
            .retain(|sender| sender.send(event.clone()).is_ok());
    }

    fn close(&mut self, terminal: TaskStreamEvent) {
        self.senders.clear();
        self.terminal = Some(terminal);
    }
}

/// Multiplexes [`TaskStreamEvent`]s to subscribers per task.
pub struct TaskEventBus {
    inner: DashMap<TaskId, Subscribers>,
}

impl TaskEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Subscribes to events for `task_id` from this point on.
    ///
    /// On a closed stream the subscription yields the final event and ends.
    #[must_use]
    pub fn subscribe(&self, task_id: &str) -> TaskSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.entry(task_id.to_string()).or_default().add(tx);
        TaskSubscription {
            task_id: task_id.to_string(),
            receiver: rx,
        }
    }

    /// Publishes an event to every current subscriber of its task.
    ///
    /// Returns `false` when the task's stream is already closed and the event
    /// was dropped.
    pub fn publish(&self, event: TaskStreamEvent) -> bool {
        let mut entry = self.inner.entry(event.task_id().to_string()).or_default();
        if entry.terminal.is_some() {
            tracing::debug!(task_id = %event.task_id(), "dropping event published after final event");
            return false;
        }

        entry.broadcast(&event);
        if event.is_final() {
            entry.close(event);
        }
        true
    }

    /// True once the task's final event has been published.
    pub fn is_closed(&self, task_id: &str) -> bool {
        self.inner
            .get(task_id)
            .is_some_and(|entry| entry.terminal.is_some())
    }

    /// Number of live subscribers of a task.
    pub fn subscriber_count(&self, task_id: &str) -> usize {
        self.inner.get(task_id).map_or(0, |entry| {
            entry
                .senders
                .iter()
                .filter(|sender| !sender.is_closed())
                .count()
        })
    }
}

impl Default for TaskEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A consumer handle bound to one task's stream.
///
/// Ends after the final event. Dropping it unsubscribes.
#[derive(Debug)]
pub struct TaskSubscription {
    task_id: String,
    receiver: UnboundedReceiver<TaskStreamEvent>,
}

impl TaskSubscription {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Waits for the next event; `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<TaskStreamEvent> {
        self.receiver.recv().await
    }
}

impl Stream for TaskSubscription {
    type Item = TaskStreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::{
        Artifact, Part, TaskArtifactUpdateEvent, TaskState, TaskStatus, TaskStatusUpdateEvent,
    };
    use futures::StreamExt;

    fn status(task_id: &str, state: TaskState, is_final: bool) -> TaskStreamEvent {
        TaskStreamEvent::StatusUpdate(TaskStatusUpdateEvent {
            id: task_id.into(),
            status: TaskStatus::new(state, None),
            is_final,
            metadata: None,
        })
    }

    fn artifact(task_id: &str) -> TaskStreamEvent {
        TaskStreamEvent::ArtifactUpdate(TaskArtifactUpdateEvent {
            id: task_id.into(),
            artifact: Artifact::new(0, vec![Part::text("done")]),
            metadata: None,
        })
    }

    #[tokio::test]
    async fn subscribers_see_events_from_subscription_on() {
        let bus = TaskEventBus::new();
        let mut early = bus.subscribe("task-1");
        bus.publish(status("task-1", TaskState::Working, false));

        let mut late = bus.subscribe("task-1");
        bus.publish(artifact("task-1"));
        bus.publish(status("task-1", TaskState::Completed, true));

        let early_events: Vec<_> = (&mut early).collect().await;
        assert_eq!(early_events.len(), 3);
        assert!(early_events[2].is_final());

        let late_events: Vec<_> = (&mut late).collect().await;
        assert_eq!(late_events.len(), 2);
        assert!(matches!(late_events[0], TaskStreamEvent::ArtifactUpdate(_)));
    }

    #[tokio::test]
    async fn subscribing_after_close_replays_final_event_only() {
        let bus = TaskEventBus::new();
        bus.publish(status("task-1", TaskState::Working, false));
        bus.publish(status("task-1", TaskState::Failed, true));
        assert!(bus.is_closed("task-1"));

        for _ in 0..2 {
            let mut subscription = bus.subscribe("task-1");
            let event = subscription.recv().await.unwrap();
            assert!(event.is_final());
            assert!(subscription.recv().await.is_none());
        }
    }

    #[tokio::test]
    async fn events_after_final_are_dropped() {
        let bus = TaskEventBus::new();
        let mut subscription = bus.subscribe("task-1");
        assert!(bus.publish(status("task-1", TaskState::Canceled, true)));
        assert!(!bus.publish(status("task-1", TaskState::Working, false)));

        let events: Vec<_> = (&mut subscription).collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(bus.subscriber_count("task-1"), 0);
    }

    #[tokio::test]
    async fn tasks_are_isolated() {
        let bus = TaskEventBus::new();
        let mut a = bus.subscribe("a");
        let b = bus.subscribe("b");
        bus.publish(status("a", TaskState::Completed, true));

        assert_eq!(a.recv().await.unwrap().task_id(), "a");
        assert!(!bus.is_closed("b"));
        assert_eq!(bus.subscriber_count("b"), 1);
        drop(b);
        assert_eq!(bus.subscriber_count("b"), 0);
    }
}
