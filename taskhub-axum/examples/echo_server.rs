//! Minimal taskhub server with an agent that echoes the query and counts the
//! turns of each session.
//!
//! ```sh
//! cargo run -p taskhub-axum --example echo_server
//! ```
//!
//! Settings come from the `TASKHUB_*` environment variables (a `.env` file is
//! honoured).

use std::sync::Arc;

use a2a_types::{AgentCard, AgentSkill};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use taskhub::agents::{Agent, AgentRequest, AgentResponse, AgentStream, AgentStreamItem};
use taskhub::config::ConfigLoader;
use taskhub::sessions::ContextBlob;
use taskhub::TaskResult;
use taskhub_axum::{init_tracing, TaskHubServer};

struct EchoAgent;

impl EchoAgent {
    fn answer(request: &AgentRequest) -> AgentResponse {
        let turn = request
            .prior_context
            .as_ref()
            .and_then(|context| context.as_value().get("turns"))
            .and_then(|turns| turns.as_u64())
            .unwrap_or(0)
            + 1;

        AgentResponse::new(
            format!("[turn {turn}] {}", request.query),
            ContextBlob::new(json!({ "turns": turn })),
        )
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn invoke(&self, request: AgentRequest) -> TaskResult<AgentResponse> {
        Ok(Self::answer(&request))
    }

    async fn stream(&self, request: AgentRequest) -> TaskResult<AgentStream> {
        let items = vec![
            Ok(AgentStreamItem::Progress("Echoing...".to_string())),
            Ok(AgentStreamItem::Final(Self::answer(&request))),
        ];
        Ok(futures::stream::iter(items).boxed())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = ConfigLoader::from_env()?;
    let card = AgentCard::new("Echo Agent", "", "0.1.0")
        .with_description("Repeats what you say and remembers how long you have been talking")
        .add_skill(
            AgentSkill::new("echo", "Echo")
                .with_description("Echoes the message text")
                .add_example("hello there"),
        );

    TaskHubServer::builder(Arc::new(EchoAgent), card)
        .with_config(config)
        .build()?
        .serve()
        .await?;

    Ok(())
}
