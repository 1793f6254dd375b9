//! Client error type.

use thiserror::Error;

/// Errors from talking to the API or reading persisted state.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a usable response.
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Reading or writing local storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Checkout details are missing.
    #[error("{0}")]
    Checkout(&'static str),

    /// Local storage holds data that cannot be decoded.
    #[error("invalid stored data: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    /// The text shown for a failed operation.
    ///
    /// The API's `message` when there is one, else the transport error.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// HTTP status of an API error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
