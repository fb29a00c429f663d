//! # Task Protocol Types
//!
//! Rust data structures for the agent task protocol spoken by `taskhub`
//! servers: JSON-RPC 2.0 envelopes, the `Task` lifecycle objects, the streaming
//! update events and the push-notification configuration. All types
//! serialize with `serde` using the camelCase field names of the wire format.
//!
//! The protocol lets a client:
//! - Discover an agent's capabilities via the `AgentCard`.
//! - Submit `Task`s synchronously (`tasks/send`) or with streaming updates
//!   (`tasks/sendSubscribe`).
//! - Reattach to a task's update stream (`tasks/resubscribe`).
//! - Register a callback URL that receives signed task snapshots.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod agent_card;
pub mod jwks;

pub use agent_card::{AgentCapabilities, AgentCard, AgentSkill};
pub use jwks::{JsonWebKey, JsonWebKeySet};

// ============================================================================
// JSON-RPC 2.0 Base Types
// ============================================================================

/// Request id: string, integer or null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JSONRPCId {
    String(String),
    Integer(i64),
    Null,
}

/// Inbound JSON-RPC call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCRequest {
    /// Must be `"2.0"`.
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    /// Absent for notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JSONRPCId>,
}

/// Represents a JSON-RPC 2.0 Response object. Exactly one of `result` and
/// `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JSONRPCResponse {
    /// The version of the JSON-RPC protocol. Always "2.0".
    pub jsonrpc: String,
    /// The value produced by the invoked method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JSONRPCError>,
    /// Echo of the request id.
    pub id: Option<JSONRPCId>,
}

impl JSONRPCResponse {
    pub fn success(id: Option<JSONRPCId>, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Option<JSONRPCId>, error: JSONRPCError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error),
            id,
        }
    }
}

/// Error member of a failed JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JSONRPCError {
    pub code: i32,
    pub message: String,
    /// Structured details, e.g. the offending task id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JSONRPCError {
    fn with_default(code: i32, default_message: &str, message: Option<String>) -> Self {
        Self {
            code,
            message: message.unwrap_or_else(|| default_message.to_string()),
            data: None,
        }
    }

    pub fn parse_error(message: Option<String>) -> Self {
        Self::with_default(JSON_PARSE_ERROR_CODE, JSON_PARSE_ERROR_MESSAGE, message)
    }

    pub fn invalid_request(message: Option<String>) -> Self {
        Self::with_default(
            INVALID_REQUEST_ERROR_CODE,
            INVALID_REQUEST_ERROR_MESSAGE,
            message,
        )
    }

    pub fn method_not_found(message: Option<String>) -> Self {
        Self::with_default(
            METHOD_NOT_FOUND_ERROR_CODE,
            METHOD_NOT_FOUND_ERROR_MESSAGE,
            message,
        )
    }

    pub fn invalid_params(message: Option<String>) -> Self {
        Self::with_default(
            INVALID_PARAMS_ERROR_CODE,
            INVALID_PARAMS_ERROR_MESSAGE,
            message,
        )
    }

    pub fn internal(message: Option<String>) -> Self {
        Self::with_default(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE, message)
    }

    pub fn task_not_found(message: Option<String>) -> Self {
        Self::with_default(
            TASK_NOT_FOUND_ERROR_CODE,
            TASK_NOT_FOUND_ERROR_MESSAGE,
            message,
        )
    }

    pub fn task_not_cancelable(message: Option<String>) -> Self {
        Self::with_default(
            TASK_NOT_CANCELABLE_ERROR_CODE,
            TASK_NOT_CANCELABLE_ERROR_MESSAGE,
            message,
        )
    }

    pub fn push_notification_not_supported(message: Option<String>) -> Self {
        Self::with_default(
            PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_CODE,
            PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_MESSAGE,
            message,
        )
    }

    pub fn unsupported_operation(message: Option<String>) -> Self {
        Self::with_default(
            UNSUPPORTED_OPERATION_ERROR_CODE,
            UNSUPPORTED_OPERATION_ERROR_MESSAGE,
            message,
        )
    }

    pub fn content_type_not_supported(message: Option<String>) -> Self {
        Self::with_default(
            CONTENT_TYPE_NOT_SUPPORTED_ERROR_CODE,
            CONTENT_TYPE_NOT_SUPPORTED_ERROR_MESSAGE,
            message,
        )
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

// Error code and message constants
pub const JSON_PARSE_ERROR_CODE: i32 = -32700;
const JSON_PARSE_ERROR_MESSAGE: &str = "Invalid JSON payload";
pub const INVALID_REQUEST_ERROR_CODE: i32 = -32600;
const INVALID_REQUEST_ERROR_MESSAGE: &str = "Request payload validation error";
pub const METHOD_NOT_FOUND_ERROR_CODE: i32 = -32601;
const METHOD_NOT_FOUND_ERROR_MESSAGE: &str = "Method not found";
pub const INVALID_PARAMS_ERROR_CODE: i32 = -32602;
const INVALID_PARAMS_ERROR_MESSAGE: &str = "Invalid parameters";
pub const INTERNAL_ERROR_CODE: i32 = -32603;
const INTERNAL_ERROR_MESSAGE: &str = "Internal error";
pub const TASK_NOT_FOUND_ERROR_CODE: i32 = -32001;
const TASK_NOT_FOUND_ERROR_MESSAGE: &str = "Task not found";
pub const TASK_NOT_CANCELABLE_ERROR_CODE: i32 = -32002;
const TASK_NOT_CANCELABLE_ERROR_MESSAGE: &str = "Task cannot be canceled";
pub const PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_CODE: i32 = -32003;
const PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_MESSAGE: &str = "Push Notification is not supported";
pub const UNSUPPORTED_OPERATION_ERROR_CODE: i32 = -32004;
const UNSUPPORTED_OPERATION_ERROR_MESSAGE: &str = "This operation is not supported";
pub const CONTENT_TYPE_NOT_SUPPORTED_ERROR_CODE: i32 = -32005;
const CONTENT_TYPE_NOT_SUPPORTED_ERROR_MESSAGE: &str = "Incompatible content types";

// ============================================================================
// Core Task Types
// ============================================================================

/// Where a task is in its lifecycle.
///
/// `Submitted` and `Working` are the only non-terminal states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// The task has been accepted and is awaiting execution.
    Submitted,
    Working,
    Completed,
    Failed,
    /// The task has been canceled by the client.
    Canceled,
}

impl TaskState {
    /// Returns true for states a task can never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Position along `submitted -> working -> terminal`.
    pub fn rank(self) -> u8 {
        match self {
            Self::Submitted => 0,
            Self::Working => 1,
            Self::Completed | Self::Failed | Self::Canceled => 2,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Working => "working",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

/// State of a task plus the agent message that accompanied the transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatus {
    pub state: TaskState,
    /// Progress text or error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// RFC 3339 time of the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl TaskStatus {
    /// Creates a status stamped with the current time.
    pub fn new(state: TaskState, message: Option<Message>) -> Self {
        Self {
            state,
            message,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// A single unit of agent work with its own lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier of the task, chosen by the client.
    pub id: String,
    /// Identifier of the session (conversation) this task belongs to.
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// The current status of the task.
    pub status: TaskStatus,
    /// Artifacts produced by the agent, in production order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifacts: Vec<Artifact>,
    /// Messages exchanged during the task, in chronological order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub history: Vec<Message>,
    /// Optional metadata supplied with the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Identifies the sender of a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Agent,
}

/// One conversational turn fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Identifies the sender of the message.
    pub role: MessageRole,
    pub parts: Vec<Part>,
    /// Optional metadata associated with the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Message {
    /// Creates a single-text-part message.
    pub fn text(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            parts: vec![Part::text(text)],
            metadata: None,
        }
    }

    /// Concatenates the text parts with newlines.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(Part::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Content of a message or artifact, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Part {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
    File {
        file: FileContent,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<HashMap<String, serde_json::Value>>,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text {
            text: text.into(),
            metadata: None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text, .. } => Some(text),
            Part::File { .. } => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileContent> {
        match self {
            Part::File { file, .. } => Some(file),
            Part::Text { .. } => None,
        }
    }
}

/// File content, provided either inline as base64 `bytes` or by `uri`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Base64-encoded content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// Output produced by the agent and attached to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered content parts.
    pub parts: Vec<Part>,
    /// Position of the artifact within the task.
    #[serde(default)]
    pub index: u32,
    /// When true, the parts extend the artifact already stored at `index`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub append: bool,
    #[serde(skip_serializing_if = "Option::is_none", rename = "lastChunk")]
    pub last_chunk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl Artifact {
    /// A complete (non-appending) artifact at `index`.
    pub fn new(index: u32, parts: Vec<Part>) -> Self {
        Self {
            name: None,
            description: None,
            parts,
            index,
            append: false,
            last_chunk: None,
            metadata: None,
        }
    }
}

// ============================================================================
// Method Parameter Types
// ============================================================================

/// Parameters of `tasks/send` and `tasks/sendSubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSendParams {
    /// Client-chosen task identifier.
    pub id: String,
    /// Session the task belongs to. A fresh one is generated when absent.
    #[serde(rename = "sessionId", default = "new_session_id")]
    pub session_id: String,
    /// The user message driving this turn.
    pub message: Message,
    /// Output MIME types the client can accept.
    #[serde(
        rename = "acceptedOutputModes",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub accepted_output_modes: Option<Vec<String>>,
    /// Callback registration to create alongside the task.
    #[serde(
        rename = "pushNotification",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub push_notification: Option<PushNotificationConfig>,
    /// Number of recent history messages to include in the returned task.
    #[serde(
        rename = "historyLength",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub history_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

fn new_session_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Parameters identifying a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Parameters of `tasks/get` and `tasks/resubscribe`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueryParams {
    pub id: String,
    #[serde(
        rename = "historyLength",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub history_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Authentication details the agent should present to a push endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticationInfo {
    pub schemes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Where and how task updates are pushed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushNotificationConfig {
    pub url: String,
    /// Opaque token echoed back to the receiver with every notification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationInfo>,
}

/// Push notification config bound to a task id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPushNotificationConfig {
    pub id: String,
    #[serde(rename = "pushNotificationConfig")]
    pub push_notification_config: PushNotificationConfig,
}

// ============================================================================
// Streaming Event Types
// ============================================================================

/// Notifies subscribers of a change in a task's status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskStatusUpdateEvent {
    pub id: String,
    pub status: TaskStatus,
    /// If true, this is the last event of the task's stream.
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Notifies subscribers that an artifact has been produced or extended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskArtifactUpdateEvent {
    pub id: String,
    pub artifact: Artifact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// One item of a task's update stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TaskStreamEvent {
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
}

impl TaskStreamEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::StatusUpdate(update) => &update.id,
            Self::ArtifactUpdate(update) => &update.id,
        }
    }

    /// True for the status update that closes the stream.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::StatusUpdate(update) if update.is_final)
    }
}

pub const JSONRPC_VERSION: &str = "2.0";

// Method names
pub const METHOD_SEND_TASK: &str = "tasks/send";
pub const METHOD_SEND_TASK_SUBSCRIBE: &str = "tasks/sendSubscribe";
pub const METHOD_GET_TASK: &str = "tasks/get";
pub const METHOD_CANCEL_TASK: &str = "tasks/cancel";
pub const METHOD_RESUBSCRIBE: &str = "tasks/resubscribe";
pub const METHOD_SET_PUSH_NOTIFICATION: &str = "tasks/pushNotification/set";
pub const METHOD_GET_PUSH_NOTIFICATION: &str = "tasks/pushNotification/get";
