//! HTTP route handlers for the chat API.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::conversation::{ConversationSnapshot, SessionId};
use crate::orchestrator::{TurnError, TurnKind};

use super::state::{AppState, Session};

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/messages", post(send_message))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "synapse-chat",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// A session and its conversation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionView {
    /// Session identifier.
    pub id: SessionId,
    /// Conversation snapshot.
    #[serde(flatten)]
    pub conversation: ConversationSnapshot,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            conversation: session.orchestrator.snapshot(),
        }
    }
}

/// Message submission request.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// The user's message.
    pub message: String,
}

/// Result of one turn.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    /// Appended assistant message text.
    pub reply: String,
    /// How the turn ended.
    pub outcome: TurnKind,
    /// Whether the turn produced a usable answer.
    pub success: bool,
}

/// Open a session.
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SessionView>), (StatusCode, String)> {
    let session = state.open_session().map_err(|e| {
        tracing::error!(error = %e, "failed to open session");
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Session error: {e}"))
    })?;
    Ok((StatusCode::CREATED, Json(SessionView::from(session.as_ref()))))
}

/// Read a session's conversation.
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionView>, (StatusCode, String)> {
    let session = find(&state, id)?;
    Ok(Json(SessionView::from(session.as_ref())))
}

/// Run one turn.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, (StatusCode, String)> {
    let session = find(&state, id)?;
    let outcome = session
        .orchestrator
        .submit(&request.message)
        .await
        .map_err(|e| {
            let status = match e {
                TurnError::EmptyMessage => StatusCode::BAD_REQUEST,
                TurnError::Busy => StatusCode::CONFLICT,
            };
            (status, e.to_string())
        })?;

    Ok(Json(SendMessageResponse {
        reply: outcome.reply.content,
        success: outcome.kind.success(),
        outcome: outcome.kind,
    }))
}

/// End a session.
async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<SessionId>) -> StatusCode {
    if state.close_session(id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn find(state: &AppState, id: SessionId) -> Result<Arc<Session>, (StatusCode, String)> {
    state
        .session(id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown session: {id}")))
}
