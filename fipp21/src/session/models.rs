//! Session data models.

use serde::{Deserialize, Serialize};

/// User ID type
pub type UserId = i64;

/// Opaque bearer token issued by the API at sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Signed-in user, kept for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
}

impl Identity {
    /// A zero id is how the API marks a missing user.
    pub fn is_well_formed(&self) -> bool {
        self.id != 0
    }
}

/// How much the client trusts the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Restored from storage and not yet confirmed by an authenticated call
    Provisional,
    /// Issued by a sign-in or confirmed by a successful authenticated call
    Verified,
}

/// The active session
#[derive(Debug, Clone)]
pub struct Session {
    pub credential: Credential,
    pub identity: Identity,
    pub status: SessionStatus,
}

/// What [`SessionStore::restore`](super::SessionStore::restore) found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A persisted session was adopted
    Restored,
    /// Nothing was persisted
    Empty,
    /// Partial or corrupt persisted state was discarded
    Discarded,
}
