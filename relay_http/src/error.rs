use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chat_relay::RelayError;
use serde::Serialize;

/// Failure returned to HTTP callers as `{"error": ".."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Relay(RelayError),
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::Relay(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Relay(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Relay(e) => e.to_string(),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
