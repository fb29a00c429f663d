//! Server configuration.
//!
//! [`TaskHubConfig`] is loaded from YAML or JSON with [`ConfigLoader`]; a
//! handful of `TASKHUB_*` environment variables override the file.

pub mod loader;
pub mod types;

pub use loader::{
    load_dotenv, ConfigLoader, EnvResolverFn, ENV_BASE_URL, ENV_BIND_ADDRESS, ENV_MAX_CONTEXTS,
    ENV_PUSH_ENABLED,
};
pub use types::{PushSettings, ServerSettings, SessionSettings, TaskHubConfig};
