use a2a_types::{
    AgentCard, JSONRPCId, JSONRPCRequest, JSONRPCResponse, JsonWebKeySet, TaskIdParams,
    TaskPushNotificationConfig, TaskQueryParams, TaskSendParams, METHOD_CANCEL_TASK,
    METHOD_GET_PUSH_NOTIFICATION, METHOD_GET_TASK, METHOD_RESUBSCRIBE, METHOD_SEND_TASK,
    METHOD_SEND_TASK_SUBSCRIBE, METHOD_SET_PUSH_NOTIFICATION,
};
use async_stream::stream;
use axum::{
    body::Bytes,
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use serde::Serialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use taskhub::events::TaskSubscription;
use taskhub::TaskManager;

use crate::{
    error::{Error, Result},
    json_rpc::{parse_params, parse_request},
};

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// State shared across all routes
#[derive(Clone)]
pub struct ServerState {
    pub manager: Arc<TaskManager>,
    pub card: Arc<AgentCard>,
    pub keep_alive: Duration,
}

/// Create the JSON-RPC endpoint and the discovery documents.
pub fn create_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", post(json_rpc_handler))
        .route(AGENT_CARD_PATH, get(agent_card))
        .route(JWKS_PATH, get(jwks))
        .with_state(state)
}

/// Single JSON-RPC entry point. Streaming methods answer with an SSE stream,
/// everything else with one JSON-RPC response.
pub async fn json_rpc_handler(State(state): State<ServerState>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(error) => {
            tracing::debug!(error = %error, "rejecting malformed JSON-RPC request");
            return error.into_response();
        }
    };

    let request_id = request.id.clone();
    tracing::debug!(method = %request.method, "handling JSON-RPC request");

    match dispatch(&state, request).await {
        Ok(response) => response,
        Err(error) => {
            if let Error::Task(task_error) = &error {
                tracing::warn!(error = %task_error, "request failed");
            }
            error.into_response_with_id(request_id)
        }
    }
}

async fn dispatch(state: &ServerState, request: JSONRPCRequest) -> Result<Response> {
    let JSONRPCRequest {
        method, params, id, ..
    } = request;

    match method.as_str() {
        METHOD_SEND_TASK => {
            let params: TaskSendParams = parse_params(params)?;
            let task = state.manager.submit(params).await?;
            success(id, &task)
        }
        METHOD_GET_TASK => {
            let params: TaskQueryParams = parse_params(params)?;
            let task = state.manager.get_task(params).await?;
            success(id, &task)
        }
        METHOD_CANCEL_TASK => {
            let params: TaskIdParams = parse_params(params)?;
            let task = state.manager.cancel(params).await?;
            success(id, &task)
        }
        METHOD_SET_PUSH_NOTIFICATION => {
            let params: TaskPushNotificationConfig = parse_params(params)?;
            let config = state.manager.set_push_notification(params).await?;
            success(id, &config)
        }
        METHOD_GET_PUSH_NOTIFICATION => {
            let params: TaskIdParams = parse_params(params)?;
            let config = state.manager.get_push_notification(params).await?;
            success(id, &config)
        }
        METHOD_SEND_TASK_SUBSCRIBE => {
            state.require_streaming()?;
            let params: TaskSendParams = parse_params(params)?;
            let subscription = state.manager.submit_streaming(params).await?;
            Ok(build_streaming_sse(id, subscription, state.keep_alive).into_response())
        }
        METHOD_RESUBSCRIBE => {
            state.require_streaming()?;
            let params: TaskQueryParams = parse_params(params)?;
            let subscription = state.manager.resubscribe(params).await?;
            Ok(build_streaming_sse(id, subscription, state.keep_alive).into_response())
        }
        other => Err(Error::MethodNotFound(other.to_string())),
    }
}

impl ServerState {
    fn require_streaming(&self) -> Result<()> {
        if self.card.capabilities.streaming {
            Ok(())
        } else {
            Err(Error::StreamingNotSupported)
        }
    }
}

fn success<T: Serialize>(id: Option<JSONRPCId>, result: &T) -> Result<Response> {
    let result = serde_json::to_value(result)?;
    Ok(Json(JSONRPCResponse::success(id, result)).into_response())
}

/// Relays a task subscription as SSE, one JSON-RPC response per event. The
/// stream ends right after the final status update.
pub(crate) fn build_streaming_sse(
    request_id: Option<JSONRPCId>,
    mut subscription: TaskSubscription,
    keep_alive: Duration,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = stream! {
        while let Some(event) = subscription.recv().await {
            let is_final = event.is_final();
            match serde_json::to_value(&event) {
                Ok(result) => {
                    let response = JSONRPCResponse::success(request_id.clone(), result);
                    if let Ok(data) = serde_json::to_string(&response) {
                        yield Ok(Event::default().data(data));
                    }
                }
                Err(error) => {
                    tracing::warn!(task_id = %subscription.task_id(), error = %error, "dropping unserializable stream event");
                }
            }
            if is_final {
                break;
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive))
}

async fn agent_card(State(state): State<ServerState>) -> Json<AgentCard> {
    Json(state.card.as_ref().clone())
}

/// Public keys push receivers use to verify notification signatures. Empty
/// when push notifications are disabled.
async fn jwks(State(state): State<ServerState>) -> Json<JsonWebKeySet> {
    let keys = state
        .manager
        .push_notifier()
        .map(|notifier| notifier.jwks())
        .unwrap_or_default();
    Json(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::{
        Message, MessageRole, TaskState, TaskStreamEvent, INVALID_PARAMS_ERROR_CODE,
        METHOD_NOT_FOUND_ERROR_CODE, TASK_NOT_FOUND_ERROR_CODE, UNSUPPORTED_OPERATION_ERROR_CODE,
    };
    use axum::http::StatusCode;
    use serde_json::{json, Value};
    use taskhub::test_support::{final_item, progress, response, ScriptedAgent};

    fn state_with(agent: ScriptedAgent, streaming: bool) -> ServerState {
        ServerState {
            manager: Arc::new(TaskManager::new(Arc::new(agent))),
            card: Arc::new(
                AgentCard::new("Test", "http://localhost:10000/", "1.0.0")
                    .with_streaming(streaming),
            ),
            keep_alive: Duration::from_secs(15),
        }
    }

    fn rpc(method: &str, params: Value) -> Bytes {
        Bytes::from(
            json!({ "jsonrpc": "2.0", "id": "req-1", "method": method, "params": params })
                .to_string(),
        )
    }

    fn send_params(id: &str, text: &str) -> Value {
        json!({
            "id": id,
            "sessionId": "s1",
            "message": Message::text(MessageRole::User, text),
        })
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes")
            .to_vec()
    }

    async fn body_json(response: Response) -> JSONRPCResponse {
        serde_json::from_slice(&body_bytes(response).await).expect("json-rpc response")
    }

    fn sse_events(body: &[u8]) -> Vec<JSONRPCResponse> {
        String::from_utf8(body.to_vec())
            .expect("utf8")
            .split("\n\n")
            .filter_map(|chunk| {
                chunk
                    .trim()
                    .strip_prefix("data:")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
            .map(|data| serde_json::from_str(&data).expect("event json"))
            .collect()
    }

    #[tokio::test]
    async fn send_returns_completed_task() {
        let agent = ScriptedAgent::new();
        agent.push_response(Ok(response("hello back", json!({}))));
        let state = state_with(agent, true);

        let response =
            json_rpc_handler(State(state), rpc(METHOD_SEND_TASK, send_params("t1", "hi"))).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body.id, Some(JSONRPCId::String("req-1".into())));
        let task: a2a_types::Task = serde_json::from_value(body.result.expect("result")).unwrap();
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.artifacts[0].parts[0].as_text(), Some("hello back"));
    }

    #[tokio::test]
    async fn unknown_task_maps_to_task_not_found() {
        let state = state_with(ScriptedAgent::new(), true);
        let response =
            json_rpc_handler(State(state), rpc(METHOD_GET_TASK, json!({ "id": "missing" }))).await;

        let body = body_json(response).await;
        let error = body.error.expect("error");
        assert_eq!(error.code, TASK_NOT_FOUND_ERROR_CODE);
        assert_eq!(error.data, Some(json!({ "taskId": "missing" })));
    }

    #[tokio::test]
    async fn envelope_errors_are_rejected_before_dispatch() {
        let state = state_with(ScriptedAgent::new(), true);

        let response = json_rpc_handler(State(state.clone()), rpc("tasks/unknown", json!({}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await.error.expect("error").code,
            METHOD_NOT_FOUND_ERROR_CODE
        );

        let response = json_rpc_handler(
            State(state),
            Bytes::from(json!({ "jsonrpc": "2.0", "id": 1, "method": METHOD_GET_TASK }).to_string()),
        )
        .await;
        assert_eq!(
            body_json(response).await.error.expect("error").code,
            INVALID_PARAMS_ERROR_CODE
        );
    }

    #[tokio::test]
    async fn streaming_is_refused_when_card_disables_it() {
        let state = state_with(ScriptedAgent::new(), false);
        let response = json_rpc_handler(
            State(state),
            rpc(METHOD_SEND_TASK_SUBSCRIBE, send_params("t1", "hi")),
        )
        .await;

        assert_eq!(
            body_json(response).await.error.expect("error").code,
            UNSUPPORTED_OPERATION_ERROR_CODE
        );
    }

    #[tokio::test]
    async fn send_subscribe_streams_until_final() {
        let agent = ScriptedAgent::new();
        agent.push_stream(vec![
            progress("thinking"),
            progress("still thinking"),
            final_item("done", json!({})),
        ]);
        let state = state_with(agent, true);

        let response = json_rpc_handler(
            State(state),
            rpc(METHOD_SEND_TASK_SUBSCRIBE, send_params("t1", "hi")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let events: Vec<TaskStreamEvent> = sse_events(&body_bytes(response).await)
            .into_iter()
            .map(|event| serde_json::from_value(event.result.expect("result")).unwrap())
            .collect();

        assert_eq!(events.len(), 4);
        assert!(events.last().map(TaskStreamEvent::is_final).unwrap_or(false));
        assert!(matches!(events[2], TaskStreamEvent::ArtifactUpdate(_)));
    }

    #[tokio::test]
    async fn jwks_is_empty_without_push() {
        let state = state_with(ScriptedAgent::new(), true);
        let Json(keys) = jwks(State(state)).await;
        assert!(keys.keys.is_empty());
    }
}
