/// Main error type for task orchestration
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    // === Validation Errors ===
    #[error("Incompatible output modes: requested {requested:?}, supported {supported:?}")]
    UnsupportedModality {
        requested: Vec<String>,
        supported: Vec<String>,
    },

    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    // === Task Management Errors ===
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Task {task_id} is already {state} and cannot change")]
    TaskTerminal {
        task_id: String,
        state: a2a_types::TaskState,
    },

    // === Push Notification Errors ===
    #[error("Push notification URL failed verification: {url}: {reason}")]
    InvalidPushUrl { url: String, reason: String },

    #[error("Push notifications are not enabled")]
    PushNotificationsDisabled,

    // === Agent Errors ===
    #[error("Agent invocation failed: {reason}")]
    AgentInvocation { reason: String },

    // === Configuration Errors ===
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // === Network/IO Errors ===
    #[error("Network error: {operation}: {reason}")]
    Network { operation: String, reason: String },

    #[error("Serialization error: {format}: {reason}")]
    Serialization { format: String, reason: String },

    // === General System Errors ===
    #[error("Internal error: {component}: {reason}")]
    Internal { component: String, reason: String },
}

/// Convenience type alias
pub type TaskResult<T> = std::result::Result<T, TaskError>;

impl TaskError {
    /// Wraps any agent-side failure.
    pub fn agent(reason: impl std::fmt::Display) -> Self {
        Self::AgentInvocation {
            reason: reason.to_string(),
        }
    }

    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams {
            reason: reason.into(),
        }
    }

    pub fn internal(component: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Internal {
            component: component.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for TaskError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization {
            format: "json".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for TaskError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Serialization {
            format: "yaml".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<std::io::Error> for TaskError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal {
            component: "io".to_string(),
            reason: error.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for TaskError {
    fn from(error: tokio::task::JoinError) -> Self {
        let reason = if error.is_cancelled() {
            "task cancelled".to_string()
        } else if error.is_panic() {
            "task panicked".to_string()
        } else {
            error.to_string()
        };

        Self::Internal {
            component: "task".to_string(),
            reason,
        }
    }
}

impl From<reqwest::Error> for TaskError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network {
            operation: "http_request".to_string(),
            reason: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_to_string_contains_context() {
        let err = TaskError::UnsupportedModality {
            requested: vec!["text/plain".into()],
            supported: vec!["image/png".into()],
        };
        let message = err.to_string();
        assert!(message.contains("text/plain"));
        assert!(message.contains("image/png"));
    }

    #[test]
    fn terminal_error_names_state() {
        let err = TaskError::TaskTerminal {
            task_id: "t-1".into(),
            state: a2a_types::TaskState::Canceled,
        };
        assert_eq!(err.to_string(), "Task t-1 is already canceled and cannot change");
    }
}
