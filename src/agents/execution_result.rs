use crate::errors::TaskResult;
use crate::sessions::ContextBlob;
use futures::stream::BoxStream;
use std::collections::{BTreeMap, HashMap};

/// Result of a completed agent turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    pub text: String,
    /// Source snippets keyed by the citation number used in `text`.
    pub citations: BTreeMap<i64, serde_json::Value>,
    /// Conversation state to resume from on the next turn of the session.
    pub context: ContextBlob,
}

impl AgentResponse {
    pub fn new(text: impl Into<String>, context: ContextBlob) -> Self {
        Self {
            text: text.into(),
            citations: BTreeMap::new(),
            context,
        }
    }

    pub fn with_citation(mut self, number: i64, content: serde_json::Value) -> Self {
        self.citations.insert(number, content);
        self
    }

    /// Citations keyed by their decimal string, as stored in artifact metadata.
    pub fn citation_metadata(&self) -> Option<HashMap<String, serde_json::Value>> {
        if self.citations.is_empty() {
            return None;
        }
        Some(
            self.citations
                .iter()
                .map(|(number, content)| (number.to_string(), content.clone()))
                .collect(),
        )
    }
}

/// One element of an agent's streaming answer.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStreamItem {
    /// Human-readable progress, e.g. "Looking up exchange rates...".
    Progress(String),
    /// The answer; always the last item.
    Final(AgentResponse),
}

/// Stream returned by [`Agent::stream`](super::Agent::stream).
pub type AgentStream = BoxStream<'static, TaskResult<AgentStreamItem>>;
