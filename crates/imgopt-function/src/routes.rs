//! Event and health routes

use crate::error::InvocationError;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use imgopt_core::{ObjectEvent, Outcome};
use imgopt_handler::ObjectProcessor;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Storage notifications are small JSON documents.
const MAX_EVENT_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub processor: ObjectProcessor,
    /// Per-invocation deadline; `None` waits for completion.
    pub invocation_timeout: Option<Duration>,
}

/// Body returned for every event that reached a terminal outcome.
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub outcome: Outcome,
    pub code: u8,
}

impl From<Outcome> for EventResponse {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            code: outcome.exit_code(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .route("/events", post(handle_event))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(MAX_EVENT_BYTES)),
        )
        .with_state(state)
}

async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ObjectEvent>,
) -> Result<Json<EventResponse>, InvocationError> {
    let invocation = state.processor.handle(&event);

    let outcome = match state.invocation_timeout {
        Some(timeout) => tokio::time::timeout(timeout, invocation)
            .await
            .map_err(|_| InvocationError::Timeout(timeout))??,
        None => invocation.await?,
    };

    Ok(Json(outcome.into()))
}

async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
