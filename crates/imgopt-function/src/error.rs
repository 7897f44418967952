//! HTTP rendering of invocation errors
//!
//! Any non-2xx answer makes the delivering transport redeliver the event, so
//! only faults and deadline expiry map to error statuses. Modelled failures
//! are ordinary `200` outcomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgopt_handler::HandlerError;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    /// Whether redelivering the event may succeed
    pub recoverable: bool,
}

/// Why an invocation produced no outcome
#[derive(Debug)]
pub enum InvocationError {
    Fault(HandlerError),
    Timeout(Duration),
}

impl From<HandlerError> for InvocationError {
    fn from(err: HandlerError) -> Self {
        InvocationError::Fault(err)
    }
}

impl IntoResponse for InvocationError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            InvocationError::Fault(fault) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: fault.to_string(),
                    code: "FAULT".to_string(),
                    stage: Some(fault.stage().as_str().to_string()),
                    recoverable: true,
                },
            ),
            InvocationError::Timeout(timeout) => {
                tracing::warn!(
                    timeout_secs = timeout.as_secs(),
                    "Invocation deadline exceeded"
                );
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorResponse {
                        error: format!("invocation exceeded {}s", timeout.as_secs()),
                        code: "TIMEOUT".to_string(),
                        stage: None,
                        recoverable: true,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
