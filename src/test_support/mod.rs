//! Shared fixtures for taskhub tests.
//!
//! Available when the `test-support` feature is enabled or when running the
//! crate's own tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::agents::{Agent, AgentRequest, AgentResponse, AgentStream, AgentStreamItem};
use crate::errors::{TaskError, TaskResult};
use crate::sessions::ContextBlob;
use futures::StreamExt;

enum ScriptedStream {
    Items(Vec<TaskResult<AgentStreamItem>>),
    /// Yields the items and then never finishes.
    Stalled(Vec<TaskResult<AgentStreamItem>>),
}

/// An [`Agent`] that replays pre-seeded outcomes.
///
/// Invoke responses and stream scripts are kept in separate queues. Every
/// request is recorded so tests can assert on the prior context each turn
/// received. Clones share their state. An exhausted queue surfaces an
/// internal error so missing expectations are obvious.
#[derive(Clone, Default)]
pub struct ScriptedAgent {
    output_modes: Option<Vec<String>>,
    responses: Arc<Mutex<VecDeque<TaskResult<AgentResponse>>>>,
    streams: Arc<Mutex<VecDeque<ScriptedStream>>>,
    calls: Arc<Mutex<Vec<AgentRequest>>>,
}

impl ScriptedAgent {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the advertised output modes.
    #[must_use]
    pub fn with_output_modes(mut self, modes: Vec<String>) -> Self {
        self.output_modes = Some(modes);
        self
    }

    /// Queues the outcome of the next `invoke`.
    pub fn push_response(&self, response: TaskResult<AgentResponse>) {
        self.responses
            .lock()
            .expect("scripted responses mutex poisoned")
            .push_back(response);
    }

    /// Queues the items of the next `stream`.
    pub fn push_stream(&self, items: Vec<TaskResult<AgentStreamItem>>) {
        self.streams
            .lock()
            .expect("scripted streams mutex poisoned")
            .push_back(ScriptedStream::Items(items));
    }

    /// Queues a stream that yields `items` and then hangs, for cancellation
    /// tests.
    pub fn push_stalled_stream(&self, items: Vec<TaskResult<AgentStreamItem>>) {
        self.streams
            .lock()
            .expect("scripted streams mutex poisoned")
            .push_back(ScriptedStream::Stalled(items));
    }

    /// Requests received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<AgentRequest> {
        self.calls
            .lock()
            .expect("scripted calls mutex poisoned")
            .clone()
    }

    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.query).collect()
    }

    /// The prior context handed to each call.
    #[must_use]
    pub fn prior_contexts(&self) -> Vec<Option<ContextBlob>> {
        self.calls()
            .into_iter()
            .map(|call| call.prior_context)
            .collect()
    }

    fn record(&self, request: AgentRequest) {
        self.calls
            .lock()
            .expect("scripted calls mutex poisoned")
            .push(request);
    }
}

/// A successful response whose context is `context`.
#[must_use]
pub fn response(text: impl Into<String>, context: serde_json::Value) -> AgentResponse {
    AgentResponse::new(text, ContextBlob::new(context))
}

#[must_use]
pub fn progress(text: impl Into<String>) -> TaskResult<AgentStreamItem> {
    Ok(AgentStreamItem::Progress(text.into()))
}

#[must_use]
pub fn final_item(text: impl Into<String>, context: serde_json::Value) -> TaskResult<AgentStreamItem> {
    Ok(AgentStreamItem::Final(response(text, context)))
}

fn exhausted(what: &str) -> TaskError {
    TaskError::internal("ScriptedAgent", format!("no more scripted {what} queued"))
}

#[async_trait::async_trait]
impl Agent for ScriptedAgent {
    fn supported_output_modes(&self) -> Vec<String> {
        match &self.output_modes {
            Some(modes) => modes.clone(),
            None => crate::agents::DEFAULT_OUTPUT_MODES
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    async fn invoke(&self, request: AgentRequest) -> TaskResult<AgentResponse> {
        self.record(request);
        self.responses
            .lock()
            .expect("scripted responses mutex poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(exhausted("responses")))
    }

    async fn stream(&self, request: AgentRequest) -> TaskResult<AgentStream> {
        self.record(request);
        let script = self
            .streams
            .lock()
            .expect("scripted streams mutex poisoned")
            .pop_front()
            .ok_or_else(|| exhausted("streams"))?;

        Ok(match script {
            ScriptedStream::Items(items) => futures::stream::iter(items).boxed(),
            ScriptedStream::Stalled(items) => futures::stream::iter(items)
                .chain(futures::stream::pending())
                .boxed(),
        })
    }
}
