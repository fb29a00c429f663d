use crate::errors::TaskResult;
use crate::sessions::ContextBlob;
use a2a_types::FileContent;
use async_trait::async_trait;

use super::execution_result::{AgentResponse, AgentStream};

/// Output modes of the plain text agents.
pub const DEFAULT_OUTPUT_MODES: &[&str] = &["text", "text/plain"];

/// One turn handed to an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentRequest {
    /// Newline-joined text of the user message.
    pub query: String,
    pub session_id: String,
    /// Context saved by the last successful turn of this session, if any.
    pub prior_context: Option<ContextBlob>,
    /// File parts of the user message, in message order.
    pub attachments: Vec<FileContent>,
}

impl AgentRequest {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            session_id: session_id.into(),
            prior_context: None,
            attachments: Vec::new(),
        }
    }

    pub fn with_prior_context(mut self, context: Option<ContextBlob>) -> Self {
        self.prior_context = context;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<FileContent>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// The reasoning collaborator driven by the task manager.
///
/// Implementations wrap whatever framework actually answers the query. The
/// task manager never looks inside the context blob: it hands back the blob
/// saved by the previous successful turn and stores whatever the agent
/// returns.
///
/// Both calls may take arbitrarily long; no deadline is imposed on them.
#[async_trait]
pub trait Agent: Send + Sync {
    /// MIME types this agent can produce.
    fn supported_output_modes(&self) -> Vec<String> {
        DEFAULT_OUTPUT_MODES.iter().map(|m| m.to_string()).collect()
    }

    /// Answers the request in one call.
    async fn invoke(&self, request: AgentRequest) -> TaskResult<AgentResponse>;

    /// Answers the request as a finite sequence of progress items closed by
    /// exactly one [`AgentStreamItem::Final`](super::AgentStreamItem::Final).
    ///
    /// Each call yields a fresh stream.
    async fn stream(&self, request: AgentRequest) -> TaskResult<AgentStream>;
}
