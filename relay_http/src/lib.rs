//! HTTP front end of the relay.
//!
//! `POST /chat` relays one message, `POST /reset` forgets the session's
//! thread, `GET /health` reports liveness. The assistant service is reached
//! only through [`chat_relay::ChatRelay`], so any
//! [`chat_relay::AssistantBackend`] can be plugged in.

mod error;
mod handlers;

pub use error::ApiError;
pub use handlers::{ChatRequest, SESSION_HEADER};

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chat_relay::{ChatRelay, SessionThreads};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChatRelay>,
    pub threads: Arc<SessionThreads>,
}

impl AppState {
    pub fn new(relay: ChatRelay) -> Self {
        AppState {
            relay: Arc::new(relay),
            threads: Arc::new(SessionThreads::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(handlers::chat))
        .route("/reset", post(handlers::reset))
        .route("/health", get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
