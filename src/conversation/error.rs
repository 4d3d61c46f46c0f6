//! Conversation error types

use thiserror::Error;

/// Failure talking to the assistant endpoint
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn empty_body() -> Self {
        Self::new(TransportErrorKind::EmptyBody, "Response body was empty")
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Auth, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::InvalidRequest, message)
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ServerError, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Unknown, message)
    }

    /// Map a non-success status and its body to an error
    pub fn classify(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::auth(format!("Authentication failed: {body}")),
            400 => Self::invalid_request(format!("Invalid request: {body}")),
            500..=599 => Self::server_error(format!("Server error: {body}")),
            _ => Self::new(TransportErrorKind::Status(status), format!("HTTP {status}: {body}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Connection failures, timeouts, broken bodies
    Network,
    /// Non-success status without a more specific kind
    Status(u16),
    /// The server accepted the request but sent nothing
    EmptyBody,
    /// 401, 403
    Auth,
    /// 400
    InvalidRequest,
    /// 5xx
    ServerError,
    Unknown,
}

/// Why a turn ended early
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}
