use a2a_types::AgentCard;
use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use taskhub::agents::Agent;
use taskhub::config::TaskHubConfig;
use taskhub::TaskManager;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    error::Result,
    routes::{create_routes, ServerState, AGENT_CARD_PATH, JWKS_PATH},
};

const DEFAULT_LOG_FILTER: &str = "taskhub=debug,taskhub_axum=debug,tower_http=info";

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over the default
/// filter. Calling it twice is harmless.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// HTTP server exposing a [`TaskManager`] over JSON-RPC and SSE.
pub struct TaskHubServer {
    manager: Arc<TaskManager>,
    card: Arc<AgentCard>,
    config: TaskHubConfig,
}

impl TaskHubServer {
    /// Create a new server builder
    pub fn builder(agent: Arc<dyn Agent>, card: AgentCard) -> TaskHubServerBuilder {
        TaskHubServerBuilder::new(agent, card)
    }

    pub fn agent_card(&self) -> &AgentCard {
        &self.card
    }

    pub fn task_manager(&self) -> &Arc<TaskManager> {
        &self.manager
    }

    fn display_server_info(&self, local_addr: &SocketAddr) {
        let card = &self.card;
        let enabled = |on: bool| if on { "✅ Enabled" } else { "❌ Disabled" };

        tracing::info!("🚀 TaskHub Server Starting");
        tracing::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        tracing::info!("📡 Server listening at: http://{}", local_addr);
        tracing::info!("🤖 Agent: {} (v{})", card.name, card.version);
        tracing::info!(
            "📋 Agent Card available at: http://{}{}",
            local_addr,
            AGENT_CARD_PATH
        );
        tracing::info!("  URL: {}", card.url);
        tracing::info!("  Streaming: {}", enabled(card.capabilities.streaming));
        tracing::info!(
            "  Push Notifications: {}",
            enabled(card.capabilities.push_notifications)
        );
        if card.capabilities.push_notifications {
            tracing::info!("🔑 JWKS available at: http://{}{}", local_addr, JWKS_PATH);
        }
        tracing::info!("  Output modes: {}", card.default_output_modes.join(", "));

        if card.skills.is_empty() {
            tracing::info!("  Skills: None configured");
        } else {
            tracing::info!("  Skills: {} configured", card.skills.len());
            for skill in &card.skills {
                tracing::info!("    • {} ({})", skill.name, skill.id);
            }
        }
    }

    /// Warn about card settings that will confuse clients.
    fn validate_agent_card(&self, local_addr: &SocketAddr) {
        let card = &self.card;
        let server_url = format!("http://{}", local_addr);
        let mut warnings = Vec::new();

        if card.name.is_empty() {
            warnings.push("⚠️  AgentCard name is empty".to_string());
        }
        if card.description.as_deref().map_or(true, str::is_empty) {
            warnings.push("⚠️  AgentCard description is empty".to_string());
        }
        let card_url = card.url.trim_end_matches('/');
        if card_url != server_url {
            warnings.push(format!(
                "ℹ️  URL specified in the Card ({}) differs from server address ({})",
                card_url, server_url
            ));
        }
        if card.skills.is_empty() {
            warnings.push("ℹ️  No skills configured.".to_string());
        }

        if !warnings.is_empty() {
            tracing::warn!("⚠️  AgentCard Warnings:");
            for warning in &warnings {
                tracing::warn!("  {}", warning);
            }
            tracing::info!(
                "💡 Set server.base_url in the configuration when the server sits behind a proxy"
            );
        }
    }

    /// Convert the server into an Axum router
    pub fn into_router(self) -> Router {
        let state = ServerState {
            manager: self.manager,
            card: self.card,
            keep_alive: self.config.server.sse_keep_alive(),
        };

        create_routes(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind to the configured address and serve until the process stops.
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.server.bind_address).await?;
        self.serve_with_listener(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        self.display_server_info(&local_addr);
        self.validate_agent_card(&local_addr);

        let app = self.into_router();
        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Builder for configuring a [`TaskHubServer`]
pub struct TaskHubServerBuilder {
    agent: Arc<dyn Agent>,
    card: AgentCard,
    config: TaskHubConfig,
    manager: Option<TaskManager>,
}

impl TaskHubServerBuilder {
    fn new(agent: Arc<dyn Agent>, card: AgentCard) -> Self {
        Self {
            agent,
            card,
            config: TaskHubConfig::default(),
            manager: None,
        }
    }

    pub fn with_config(mut self, config: TaskHubConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust the agent card before the server fills in derived fields.
    pub fn with_agent_card_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(AgentCard) -> AgentCard,
    {
        self.card = f(self.card);
        self
    }

    /// Use a pre-built manager instead of deriving one from the configuration.
    /// Its agent takes precedence over the one given to the builder.
    pub fn with_task_manager(mut self, manager: TaskManager) -> Self {
        self.manager = Some(manager);
        self
    }

    /// Build the server. The card's URL, output modes and capabilities are
    /// aligned with the configuration and the agent.
    pub fn build(self) -> Result<TaskHubServer> {
        let manager = match self.manager {
            Some(manager) => manager,
            None => TaskManager::from_config(self.agent, &self.config)?,
        };

        let card = self
            .card
            .with_url(self.config.server.public_url())
            .with_streaming(true)
            .with_push_notifications(manager.push_notifier().is_some())
            .with_default_output_modes(manager.agent().supported_output_modes());

        Ok(TaskHubServer {
            manager: Arc::new(manager),
            card: Arc::new(card),
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub::test_support::ScriptedAgent;

    #[test]
    fn build_derives_card_from_config_and_agent() {
        let mut config = TaskHubConfig::default();
        config.server.base_url = Some("https://agents.example.com/currency/".into());
        config.push.enabled = false;

        let agent = ScriptedAgent::new().with_output_modes(vec!["text".into()]);
        let server = TaskHubServer::builder(
            Arc::new(agent),
            AgentCard::new("Currency Agent", "", "1.0.0"),
        )
        .with_config(config)
        .build()
        .unwrap();

        let card = server.agent_card();
        assert_eq!(card.url, "https://agents.example.com/currency/");
        assert!(card.capabilities.streaming);
        assert!(!card.capabilities.push_notifications);
        assert_eq!(card.default_output_modes, vec!["text".to_string()]);
    }

    #[tokio::test]
    async fn push_capability_follows_notifier() {
        let server = TaskHubServer::builder(
            Arc::new(ScriptedAgent::new()),
            AgentCard::new("Agent", "", "1.0.0"),
        )
        .build()
        .unwrap();

        assert!(server.agent_card().capabilities.push_notifications);
        assert!(server.task_manager().push_notifier().is_some());
    }
}
