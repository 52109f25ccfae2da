//! Relay route handlers: one POST endpoint per capability.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::adapter::http_relay::relay_path;
use crate::adapter::{CapabilityPort, HandlerRequest, InvocationError, dispatch};
use crate::capability::Capability;

/// Shared relay state.
pub struct RelayState {
    /// Port that actually runs handlers.
    pub port: Arc<dyn CapabilityPort>,
    /// Upper bound for one handler run.
    pub timeout: Duration,
}

/// Create the relay router.
pub fn create_relay_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(relay_path(Capability::Mail), post(get_mail))
        .route(relay_path(Capability::Calendar), post(get_calendar))
        .route(relay_path(Capability::WebSearch), post(web_search))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "synapse-relay",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn get_mail(State(state): State<Arc<RelayState>>, Json(request): Json<HandlerRequest>) -> (StatusCode, Json<Value>) {
    relay(&state, Capability::Mail, request).await
}

async fn get_calendar(
    State(state): State<Arc<RelayState>>,
    Json(request): Json<HandlerRequest>,
) -> (StatusCode, Json<Value>) {
    relay(&state, Capability::Calendar, request).await
}

async fn web_search(State(state): State<Arc<RelayState>>, Json(request): Json<HandlerRequest>) -> (StatusCode, Json<Value>) {
    relay(&state, Capability::WebSearch, request).await
}

async fn relay(state: &RelayState, capability: Capability, mut request: HandlerRequest) -> (StatusCode, Json<Value>) {
    // Handlers that take a timestamp always get one; web search never does.
    if capability.takes_time() {
        if request.time.is_none() {
            request.time = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        }
    } else {
        request.time = None;
    }

    let result = match tokio::time::timeout(state.timeout, dispatch(state.port.as_ref(), capability, &request)).await {
        Ok(result) => result,
        Err(_) => Err(InvocationError::process_failure(format!(
            "{capability} handler timed out after {}s",
            state.timeout.as_secs()
        ))),
    };

    match result {
        Ok(value) => (StatusCode::OK, Json(value)),
        Err(InvocationError::ProcessFailure { diagnostic }) => {
            tracing::error!(%capability, %diagnostic, "handler failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": diagnostic })))
        }
        Err(InvocationError::MalformedOutput { raw, reason }) => {
            tracing::error!(%capability, %reason, %raw, "handler returned invalid JSON");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "handler returned invalid JSON", "raw": raw })),
            )
        }
    }
}
