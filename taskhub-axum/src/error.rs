use a2a_types::{JSONRPCError, JSONRPCId, JSONRPCResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use taskhub::errors::TaskError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid JSON-RPC request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Streaming not supported")]
    StreamingNotSupported,

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The JSON-RPC error object describing this failure.
    pub fn to_jsonrpc_error(&self) -> JSONRPCError {
        match self {
            Error::Task(error) => to_jsonrpc_error(error),
            Error::Json(e) => JSONRPCError::parse_error(None).with_data(json!({ "details": e.to_string() })),
            Error::InvalidRequest(msg) => JSONRPCError::invalid_request(Some(msg.clone())),
            Error::MethodNotFound(method) => {
                JSONRPCError::method_not_found(Some(format!("Method not found: {method}")))
            }
            Error::InvalidParams(msg) => JSONRPCError::invalid_params(Some(msg.clone())),
            Error::StreamingNotSupported => {
                JSONRPCError::unsupported_operation(Some("Streaming is not supported".to_string()))
            }
            Error::Io(e) => JSONRPCError::internal(Some(e.to_string())),
        }
    }

    /// Envelope failures are reported with 400; method failures travel in a
    /// normal 200 JSON-RPC response.
    fn status(&self) -> StatusCode {
        match self {
            Error::Json(_) | Error::InvalidRequest(_) | Error::MethodNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        }
    }

    pub fn into_response_with_id(self, id: Option<JSONRPCId>) -> Response {
        let status = self.status();
        let body = JSONRPCResponse::failure(id, self.to_jsonrpc_error());
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}

/// Map a [`TaskError`] into a JSON-RPC error object.
pub fn to_jsonrpc_error(error: &TaskError) -> JSONRPCError {
    match error {
        TaskError::UnsupportedModality {
            requested,
            supported,
        } => JSONRPCError::content_type_not_supported(None)
            .with_data(json!({ "requested": requested, "supported": supported })),
        TaskError::InvalidParams { reason } => JSONRPCError::invalid_params(Some(reason.clone())),
        TaskError::TaskNotFound { task_id } => {
            JSONRPCError::task_not_found(None).with_data(json!({ "taskId": task_id }))
        }
        TaskError::TaskTerminal { task_id, state } => JSONRPCError::invalid_params(Some(format!(
            "Task {task_id} is already {state}"
        )))
        .with_data(json!({ "taskId": task_id, "state": state })),
        TaskError::InvalidPushUrl { url, .. } => {
            JSONRPCError::invalid_params(Some("Push notification URL is invalid".to_string()))
                .with_data(json!({ "url": url }))
        }
        TaskError::PushNotificationsDisabled => {
            JSONRPCError::push_notification_not_supported(None)
        }
        other => JSONRPCError::internal(None).with_data(json!({ "details": other.to_string() })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::{
        CONTENT_TYPE_NOT_SUPPORTED_ERROR_CODE, INTERNAL_ERROR_CODE, INVALID_PARAMS_ERROR_CODE,
        PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_CODE, TASK_NOT_FOUND_ERROR_CODE,
    };

    #[test]
    fn task_errors_map_to_protocol_codes() {
        let cases = [
            (
                TaskError::UnsupportedModality {
                    requested: vec!["text/plain".into()],
                    supported: vec!["image/png".into()],
                },
                CONTENT_TYPE_NOT_SUPPORTED_ERROR_CODE,
            ),
            (
                TaskError::TaskNotFound {
                    task_id: "t".into(),
                },
                TASK_NOT_FOUND_ERROR_CODE,
            ),
            (
                TaskError::InvalidPushUrl {
                    url: "http://x".into(),
                    reason: "no echo".into(),
                },
                INVALID_PARAMS_ERROR_CODE,
            ),
            (
                TaskError::PushNotificationsDisabled,
                PUSH_NOTIFICATION_NOT_SUPPORTED_ERROR_CODE,
            ),
            (TaskError::agent("boom"), INTERNAL_ERROR_CODE),
        ];

        for (error, code) in cases {
            assert_eq!(to_jsonrpc_error(&error).code, code, "{error}");
        }
    }

    #[test]
    fn envelope_errors_use_bad_request() {
        assert_eq!(
            Error::MethodNotFound("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Task(TaskError::invalid_params("x")).status(),
            StatusCode::OK
        );
    }
}
