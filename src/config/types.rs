use crate::errors::{TaskError, TaskResult};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Complete server configuration from YAML/JSON.
///
/// Every section and field has a default, so an empty document is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TaskHubConfig {
    pub server: ServerSettings,
    pub push: PushSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to.
    pub bind_address: String,
    /// Public URL advertised in the agent card. Derived from `bind_address`
    /// when absent.
    pub base_url: Option<String>,
    /// Interval between SSE keep-alive comments, in seconds.
    pub sse_keep_alive_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:10000".to_string(),
            base_url: None,
            sse_keep_alive_secs: 15,
        }
    }
}

impl ServerSettings {
    pub fn public_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None => format!("http://{}/", self.bind_address),
        }
    }

    pub fn sse_keep_alive(&self) -> Duration {
        Duration::from_secs(self.sse_keep_alive_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PushSettings {
    pub enabled: bool,
    /// Timeout of the URL challenge round-trip, in seconds.
    pub verification_timeout_secs: u64,
    /// Timeout of each notification POST, in seconds.
    pub delivery_timeout_secs: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            verification_timeout_secs: 10,
            delivery_timeout_secs: 10,
        }
    }
}

impl PushSettings {
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification_timeout_secs)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    /// Upper bound on stored session contexts; unbounded when absent.
    pub max_contexts: Option<usize>,
}

impl SessionSettings {
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.max_contexts.and_then(NonZeroUsize::new)
    }
}

impl TaskHubConfig {
    pub fn validate(&self) -> TaskResult<()> {
        if self.server.bind_address.trim().is_empty() {
            return Err(invalid("server.bind_address", "must not be empty"));
        }
        if self.server.sse_keep_alive_secs == 0 {
            return Err(invalid("server.sse_keep_alive_secs", "must be greater than 0"));
        }
        if self.push.verification_timeout_secs == 0 {
            return Err(invalid(
                "push.verification_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.push.delivery_timeout_secs == 0 {
            return Err(invalid("push.delivery_timeout_secs", "must be greater than 0"));
        }
        if self.sessions.max_contexts == Some(0) {
            return Err(invalid("sessions.max_contexts", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> TaskError {
    TaskError::InvalidConfiguration {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
