use thiserror::Error;

use crate::models::Role;

pub const GENERIC_REQUEST_FAILURE: &str = "Request failed";

/// Coarse classification callers branch on instead of message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Authorization,
    Validation,
    Storage,
}

#[derive(Error, Debug)]
pub enum ClientError {
    /// Non-success HTTP status; `message` is the backend's `detail` or the generic fallback.
    #[error("{message}")]
    Request { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Expected role {expected}, session has role {actual}")]
    AuthorizationMismatch { expected: Role, actual: Role },
    #[error("{0}")]
    Validation(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Task '{0}' not found")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Request { status: 401 | 403, .. } => ErrorKind::Authorization,
            ClientError::AuthorizationMismatch { .. } => ErrorKind::Authorization,
            ClientError::Request { .. } | ClientError::Network(_) | ClientError::Decode(_) => {
                ErrorKind::Network
            }
            ClientError::Validation(_) | ClientError::NotFound(_) | ClientError::Config(_) => {
                ErrorKind::Validation
            }
            ClientError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            ClientError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
