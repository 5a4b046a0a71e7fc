use parley_core::{Role, RoomId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("relay answered {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid relay response: {0}")]
    Decode(String),

    #[error("invalid relay url: {0}")]
    InvalidUrl(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("expected the {expected} role but the relay assigned {actual}")]
    RoleMismatch { expected: Role, actual: Role },

    #[error("cancelled")]
    Cancelled,
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn engine(err: anyhow::Error) -> Self {
        ClientError::Engine(format!("{err:#}"))
    }

    /// Errors after which negotiation cannot continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::RoomFull(_)
                | ClientError::Forbidden(_)
                | ClientError::RoleMismatch { .. }
                | ClientError::Engine(_)
                | ClientError::InvalidUrl(_)
                | ClientError::Cancelled
        )
    }
}
