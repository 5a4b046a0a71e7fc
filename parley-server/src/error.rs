use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_core::{ErrorBody, RoomId};
use thiserror::Error;
use tracing::{debug, error};

/// Failures of the relay, mapped one-to-one onto HTTP statuses.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// Not a failure of the relay: the blob simply has not been posted yet.
    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type RelayResult<T> = Result<T, RelayError>;

impl RelayError {
    /// Only store outages are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, RelayError::StoreUnavailable(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::Forbidden(_) => StatusCode::FORBIDDEN,
            RelayError::RoomFull(_) => StatusCode::CONFLICT,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<redis::RedisError> for RelayError {
    fn from(err: redis::RedisError) -> Self {
        RelayError::StoreUnavailable(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = Json(ErrorBody {
            error: self.to_string(),
            status: status.as_u16(),
        });
        (status, body).into_response()
    }
}
