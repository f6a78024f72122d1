use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use core::time::Duration;
use serde::Serialize;

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no ID became available within {timeout:?}")]
    Unavailable { timeout: Duration },
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<idpool::Error> for ApiError {
    fn from(err: idpool::Error) -> Self {
        match err {
            idpool::Error::Starved { timeout } => Self::Unavailable { timeout },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(%status, error = %self, "request failed");
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
