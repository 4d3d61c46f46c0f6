//! Handler error types

use std::time::Duration;
use thiserror::Error;

/// Why a command produced no result
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Failed to run process: {0}")]
    Process(#[from] std::io::Error),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not decode payload: {0}")]
    Decode(String),

    /// A required local capability is missing
    #[error("{0}")]
    Unavailable(String),

    #[error("Command timed out after {0:?}")]
    TimedOut(Duration),
}

impl HandlerError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<base64::DecodeError> for HandlerError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
