use reqwest::StatusCode;
use thiserror::Error;

use crate::response::{JsonParseError, status_error_message};

/// Failure of a single API call.
///
/// Whether an error is fatal is decided by the caller: the dispatch call
/// treats every variant as fatal, the polling loops treat them as transient.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection failure, timeout, or body read failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The platform answered with a non-2xx status.
    #[error("API request failed: {status}{}. Response: {body}", hint_suffix(.status))]
    Status { status: StatusCode, body: String },
    #[error(transparent)]
    Decode(#[from] JsonParseError),
    #[error("invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("credential contains characters not allowed in an HTTP header")]
    InvalidCredential,
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(error) => error.status(),
            _ => None,
        }
    }

    /// True when the client-side timeout elapsed before a response arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(error) if error.is_timeout())
    }
}

fn hint_suffix(status: &StatusCode) -> String {
    status_error_message(status.as_u16())
        .map(|hint| format!(" ({hint})"))
        .unwrap_or_default()
}
