//! Session error types.

use thiserror::Error;

use crate::api::ApiError;

/// Shown when the server rejects a sign-in without saying why.
pub const DEFAULT_SIGN_IN_FAILURE: &str = "Invalid e-mail or password.";

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server rejected the sign-in credentials
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Persisted credential or identity is missing or unreadable
    #[error("Persisted session is corrupt: {0}")]
    PersistedStateCorrupt(String),

    /// The server accepted the sign-in but returned an unusable session
    #[error("Invalid sign-in response: {0}")]
    InvalidResponse(String),

    /// Durable storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The API could not be reached or answered unexpectedly
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

impl SessionError {
    /// Get a message fit for a toast or banner.
    ///
    /// Authentication failures surface the server's own message; storage and
    /// transport details are replaced with generic wording.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Authentication { message } => message.clone(),
            SessionError::Api(e) => e.user_message("Could not reach the server."),
            SessionError::Storage(_) => "Could not save the session on this device.".to_string(),
            SessionError::PersistedStateCorrupt(_) => "No active session.".to_string(),
            SessionError::InvalidResponse(_) => "The server returned an invalid session.".to_string(),
        }
    }
}

/// Durable storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of strings
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
