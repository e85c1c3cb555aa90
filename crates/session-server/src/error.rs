//! Mapping of session errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_session::SessionError;
use serde_json::json;
use thiserror::Error;

/// Error returned by API handlers, rendered as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The request body was understood but its values are unusable.
    #[error("invalid request: {0}")]
    Invalid(String),

    /// The blocking worker running the session panicked or was cancelled.
    #[error("session worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Session(e) => match e {
                SessionError::NotFound(_) => StatusCode::NOT_FOUND,
                SessionError::AlreadyFinished { .. } => StatusCode::CONFLICT,
                SessionError::MalformedInput { .. }
                | SessionError::InputRequired { .. }
                | SessionError::InvalidPosition(_) => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::StrategyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                SessionError::Checkpoint(_) | SessionError::Rules(_) | SessionError::Ledger(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
