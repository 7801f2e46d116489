use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chat_relay::{RelayReply, ThreadId, DEFAULT_SESSION};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::*;

use crate::{ApiError, AppState};

/// Header naming the caller's session. Requests without it share one session.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

fn session_key(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

pub async fn chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<RelayReply>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!("chat rejected body: {}", e);
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;
    let message = req
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing message".to_string()))?;

    let requested = match req.thread_id.as_deref().filter(|t| !t.is_empty()) {
        Some(raw) => Some(
            ThreadId::parse(raw)
                .ok_or_else(|| ApiError::BadRequest("Invalid threadId".to_string()))?,
        ),
        None => None,
    };

    let session = session_key(&headers);
    let slot = state.threads.slot(&session);
    // Held until the reply is in: one run at a time per session.
    let mut current = slot.lock().await;

    let thread = requested.or_else(|| current.clone());
    debug!("chat session={} thread={:?}", session, thread);

    let thread_id = match state.relay.ensure_thread(thread).await {
        Ok(id) => id,
        Err(e) => {
            error!("chat session={} failed: {}", session, e);
            if current.is_none() {
                state.threads.release(&session, &slot);
            }
            return Err(e.into());
        }
    };
    // Stored before the run: a failed run keeps the thread for the next message.
    *current = Some(thread_id.clone());

    state.relay.relay_on(&message, thread_id).await.map(Json).map_err(|e| {
        error!("chat session={} failed: {}", session, e);
        ApiError::from(e)
    })
}

pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    state.threads.reset(&session_key(&headers));
    Json(json!({ "success": true }))
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.threads.len(),
    }))
}
