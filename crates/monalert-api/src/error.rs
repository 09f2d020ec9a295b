//! HTTP-facing error type.
//!
//! Callers get a status code and a one-line message; internals of
//! store or snapshot failures stay in the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

use monalert_core::ValidationError;
use monalert_state::StateError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("malformed JSON body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("unsupported content type {0:?}, expected application/json")]
    UnsupportedMediaType(String),

    #[error("metric name is required")]
    MissingName,

    #[error("metric not found")]
    UnknownMetric,

    #[error(transparent)]
    State(#[from] StateError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::MissingName | ApiError::UnknownMetric => StatusCode::NOT_FOUND,
            ApiError::State(e) => match e {
                StateError::NotFound { .. } => StatusCode::NOT_FOUND,
                StateError::CounterOverflow { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
            self.to_string()
        };
        (status, message).into_response()
    }
}
