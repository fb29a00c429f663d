//! Axum HTTP surface for `taskhub`: a JSON-RPC endpoint with SSE streaming,
//! the agent card and the push notification key set.

pub mod error;
pub mod json_rpc;
pub mod routes;
pub mod server;

pub use error::{Error, Result};
pub use routes::{create_routes, ServerState, AGENT_CARD_PATH, JWKS_PATH};
pub use server::{init_tracing, TaskHubServer, TaskHubServerBuilder};
