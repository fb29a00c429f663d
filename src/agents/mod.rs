//! The agent collaborator boundary.
//!
//! Frameworks that actually answer queries are adapted to [`Agent`]; the task
//! manager only ever sees this two-call interface plus an opaque context blob.

pub mod agent;
pub mod execution_result;

pub use agent::{Agent, AgentRequest, DEFAULT_OUTPUT_MODES};
pub use execution_result::{AgentResponse, AgentStream, AgentStreamItem};
