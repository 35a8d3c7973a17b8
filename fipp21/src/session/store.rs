//! Session store: restore, sign-in, sign-out.

use super::errors::{DEFAULT_SIGN_IN_FAILURE, SessionError, SessionResult};
use super::models::{Credential, Identity, RestoreOutcome, Session, SessionStatus};
use super::storage::{CREDENTIAL_KEY, IDENTITY_KEY, Storage};
use crate::api::{ApiClient, ApiError, ApiResult};

/// Owns the authenticated-session lifecycle.
///
/// The credential is mirrored in three places that are always updated
/// together: this store's memory, durable storage, and the default
/// authorization header of the shared [`ApiClient`].
pub struct SessionStore<S: Storage> {
    api: ApiClient,
    storage: S,
    session: Option<Session>,
    ready: bool,
}

impl<S: Storage> SessionStore<S> {
    pub fn new(api: ApiClient, storage: S) -> Self {
        Self {
            api,
            storage,
            session: None,
            ready: false,
        }
    }

    /// True once [`restore`](Self::restore) has run.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.session.as_ref().map(|s| &s.identity)
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.session.as_ref().map(|s| &s.credential)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// The API client carrying this session's credential.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Adopt a previously persisted session, if a well-formed one exists.
    ///
    /// Never touches the network and never fails: anything partial or
    /// unreadable is discarded and the store starts signed out. A restored
    /// session stays [`SessionStatus::Provisional`] until an authenticated
    /// call succeeds.
    pub fn restore(&mut self) -> RestoreOutcome {
        let outcome = match self.load_persisted() {
            Ok(Some((credential, identity))) => {
                tracing::info!(user_id = identity.id, "Restored persisted session");
                self.api.set_credential(Some(credential.clone()));
                self.session = Some(Session {
                    credential,
                    identity,
                    status: SessionStatus::Provisional,
                });
                RestoreOutcome::Restored
            }
            Ok(None) => {
                self.session = None;
                self.api.set_credential(None);
                RestoreOutcome::Empty
            }
            Err(e) => {
                tracing::warn!("Discarding persisted session: {}", e);
                self.discard_persisted();
                self.session = None;
                self.api.set_credential(None);
                RestoreOutcome::Discarded
            }
        };
        self.ready = true;
        outcome
    }

    fn load_persisted(&self) -> SessionResult<Option<(Credential, Identity)>> {
        let token = self.storage.get(CREDENTIAL_KEY)?;
        let user = self.storage.get(IDENTITY_KEY)?;

        let (token, user) = match (token, user) {
            (None, None) => return Ok(None),
            (Some(token), Some(user)) => (token, user),
            (Some(_), None) => {
                return Err(SessionError::PersistedStateCorrupt(
                    "credential without identity".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(SessionError::PersistedStateCorrupt(
                    "identity without credential".to_string(),
                ));
            }
        };

        if token.trim().is_empty() {
            return Err(SessionError::PersistedStateCorrupt(
                "empty credential".to_string(),
            ));
        }

        let identity: Identity = serde_json::from_str(&user)
            .map_err(|e| SessionError::PersistedStateCorrupt(format!("identity: {}", e)))?;
        if !identity.is_well_formed() {
            return Err(SessionError::PersistedStateCorrupt(
                "identity has no id".to_string(),
            ));
        }

        Ok(Some((Credential::new(token), identity)))
    }

    fn discard_persisted(&self) {
        for key in [CREDENTIAL_KEY, IDENTITY_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, "Failed to remove persisted session entry: {}", e);
            }
        }
    }

    /// Sign in with an e-mail and secret.
    ///
    /// On success the credential is persisted, kept in memory and attached to
    /// every subsequent API call. On any failure the current session, the
    /// persisted state and the authorization header are left as they were.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Authentication`] carrying the server's message
    /// (or a generic one) when the credentials are rejected.
    pub async fn sign_in(&mut self, identifier: &str, secret: &str) -> SessionResult<Identity> {
        let response = match self.api.authenticate(identifier, secret).await {
            Ok(response) => response,
            Err(ApiError::Unauthorized { message }) => {
                return Err(Self::rejected(message));
            }
            Err(ApiError::Rejected { status, message }) if status.is_client_error() => {
                return Err(Self::rejected(message));
            }
            Err(e) => return Err(e.into()),
        };

        if response.token.trim().is_empty() {
            return Err(SessionError::InvalidResponse("empty token".to_string()));
        }
        if !response.identity.is_well_formed() {
            return Err(SessionError::InvalidResponse(
                "identity has no id".to_string(),
            ));
        }

        let credential = Credential::new(response.token);
        let identity = response.identity;
        self.persist(&credential, &identity)?;

        self.api.set_credential(Some(credential.clone()));
        self.session = Some(Session {
            credential,
            identity: identity.clone(),
            status: SessionStatus::Verified,
        });
        tracing::info!(user_id = identity.id, "Signed in");

        Ok(identity)
    }

    fn rejected(message: Option<String>) -> SessionError {
        tracing::info!("Sign-in rejected by server");
        SessionError::Authentication {
            message: message.unwrap_or_else(|| DEFAULT_SIGN_IN_FAILURE.to_string()),
        }
    }

    fn persist(&self, credential: &Credential, identity: &Identity) -> SessionResult<()> {
        let user = serde_json::to_string(identity)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;

        let written = self
            .storage
            .set(CREDENTIAL_KEY, credential.as_str())
            .and_then(|()| self.storage.set(IDENTITY_KEY, &user));

        if let Err(e) = written {
            // Put back whatever was there before this attempt.
            match &self.session {
                Some(previous) => {
                    if let Err(e) = self.persist_previous(previous) {
                        tracing::warn!("Failed to restore previous session entries: {}", e);
                    }
                }
                None => self.discard_persisted(),
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn persist_previous(&self, previous: &Session) -> SessionResult<()> {
        let user = serde_json::to_string(&previous.identity)
            .map_err(|e| SessionError::InvalidResponse(e.to_string()))?;
        self.storage
            .set(CREDENTIAL_KEY, previous.credential.as_str())?;
        self.storage.set(IDENTITY_KEY, &user)?;
        Ok(())
    }

    /// Create an account. Does not sign in.
    pub async fn register(&self, name: &str, email: &str, secret: &str) -> SessionResult<()> {
        self.api.register(name, email, secret).await?;
        tracing::info!("Registered new account");
        Ok(())
    }

    /// Forget the session locally. Needs no network and always succeeds;
    /// storage failures are logged.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(user_id = session.identity.id, "Signed out");
        }
        self.api.set_credential(None);
        self.discard_persisted();
    }

    /// Inspect the result of an authenticated API call.
    ///
    /// A 401 ends the session. A success confirms a provisional session.
    /// The result is passed through unchanged.
    pub fn guard<T>(&mut self, result: ApiResult<T>) -> ApiResult<T> {
        match &result {
            Err(e) if e.is_unauthorized() && self.session.is_some() => {
                tracing::warn!("Credential rejected by server, signing out");
                self.sign_out();
            }
            Ok(_) => {
                if let Some(session) = self.session.as_mut()
                    && session.status == SessionStatus::Provisional
                {
                    session.status = SessionStatus::Verified;
                    tracing::debug!(user_id = session.identity.id, "Restored session confirmed");
                }
            }
            Err(_) => {}
        }
        result
    }
}
