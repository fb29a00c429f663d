use crate::config::TaskHubConfig;
use crate::errors::{TaskError, TaskResult};
use std::path::Path;

pub const ENV_BIND_ADDRESS: &str = "TASKHUB_BIND_ADDRESS";
pub const ENV_BASE_URL: &str = "TASKHUB_BASE_URL";
pub const ENV_PUSH_ENABLED: &str = "TASKHUB_PUSH_ENABLED";
pub const ENV_MAX_CONTEXTS: &str = "TASKHUB_MAX_CONTEXTS";

/// Function that resolves an environment variable by name.
pub type EnvResolverFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Loads [`TaskHubConfig`] from YAML/JSON and applies environment overrides.
///
/// Overrides are read through a resolver so tests and embedders can supply
/// their own lookup; the default reads the process environment after loading
/// an optional `.env` file.
pub struct ConfigLoader {
    resolver: Box<EnvResolverFn>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            resolver: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Uses `resolver` instead of the process environment.
    pub fn with_env_resolver(
        resolver: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            resolver: Box::new(resolver),
        }
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> TaskResult<TaskHubConfig> {
        Self::new().load_from_yaml(yaml)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> TaskResult<TaskHubConfig> {
        Self::new().load_from_json(json)
    }

    /// Configuration from defaults and the environment only.
    pub fn from_env() -> TaskResult<TaskHubConfig> {
        load_dotenv();
        Self::new().finish(TaskHubConfig::default())
    }

    pub fn load_from_yaml(&self, yaml: &str) -> TaskResult<TaskHubConfig> {
        let config: TaskHubConfig = if yaml.trim().is_empty() {
            TaskHubConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        self.finish(config)
    }

    pub fn load_from_json(&self, json: &str) -> TaskResult<TaskHubConfig> {
        let config: TaskHubConfig = serde_json::from_str(json)?;
        self.finish(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as
    /// YAML.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> TaskResult<TaskHubConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| TaskError::InvalidConfiguration {
            field: path.display().to_string(),
            reason: format!("cannot read config file: {e}"),
        })?;

        tracing::debug!(path = %path.display(), "loading configuration");
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => self.load_from_json(&content),
            _ => self.load_from_yaml(&content),
        }
    }

    fn finish(&self, mut config: TaskHubConfig) -> TaskResult<TaskHubConfig> {
        self.apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&self, config: &mut TaskHubConfig) -> TaskResult<()> {
        if let Some(address) = (self.resolver)(ENV_BIND_ADDRESS) {
            config.server.bind_address = address;
        }
        if let Some(url) = (self.resolver)(ENV_BASE_URL) {
            config.server.base_url = Some(url);
        }
        if let Some(value) = (self.resolver)(ENV_PUSH_ENABLED) {
            config.push.enabled = parse_bool(ENV_PUSH_ENABLED, &value)?;
        }
        if let Some(value) = (self.resolver)(ENV_MAX_CONTEXTS) {
            let max = value
                .trim()
                .parse::<usize>()
                .map_err(|e| TaskError::InvalidConfiguration {
                    field: ENV_MAX_CONTEXTS.to_string(),
                    reason: e.to_string(),
                })?;
            config.sessions.max_contexts = Some(max);
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads `.env` from the working directory if there is one.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "ignoring malformed .env"),
    }
}

fn parse_bool(field: &str, value: &str) -> TaskResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(TaskError::InvalidConfiguration {
            field: field.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
