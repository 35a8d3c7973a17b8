//! API error types.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by [`ApiClient`](super::ApiClient) calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the credential (HTTP 401)
    #[error("Unauthorized: {}", .message.as_deref().unwrap_or("session is no longer valid"))]
    Unauthorized { message: Option<String> },

    /// The server answered with a non-success status
    #[error("Request rejected ({status}): {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was rejected locally before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The server-provided message, verbatim, when the error body carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized { message } | ApiError::Rejected { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }

    /// Message suitable for a toast or banner.
    ///
    /// Prefers the server's own wording and falls back to `fallback` so
    /// transport details are not shown to the user.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::InvalidRequest(reason) => reason.clone(),
            _ => self
                .server_message()
                .map_or_else(|| fallback.to_string(), str::to_string),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Builds the error for a non-success response from its status and raw body.
    pub(crate) fn from_response_parts(status: StatusCode, body: &str) -> Self {
        let message = extract_message(body);
        if status == StatusCode::UNAUTHORIZED {
            ApiError::Unauthorized { message }
        } else {
            ApiError::Rejected { status, message }
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls the human-readable `message` field out of an error body, if any.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
