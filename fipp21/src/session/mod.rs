//! Authenticated-session lifecycle.
//!
//! The session store holds the current credential and user identity,
//! persists them to durable client storage across restarts, and keeps the
//! shared API client's `Authorization` header in sync.
//!
//! The client-side check is a convenience, not a security boundary: the
//! server remains the only authority on whether a credential is valid.
//!
//! ## Example
//!
//! ```no_run
//! use fipp21::api::ApiClient;
//! use fipp21::session::{FileStorage, RestoreOutcome, SessionStore};
//!
//! # async fn run() -> Result<(), fipp21::session::SessionError> {
//! let api = ApiClient::new("http://localhost:5000".to_string());
//! let mut store = SessionStore::new(api, FileStorage::new(".fipp21/session.json"));
//!
//! if store.restore() != RestoreOutcome::Restored {
//!     store.sign_in("a@b.com", "secret").await?;
//! }
//! let rooms = store.api().my_rooms().await;
//! let rooms = store.guard(rooms)?;
//! println!("{} rooms", rooms.len());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod models;
pub mod storage;
pub mod store;

pub use errors::{SessionError, SessionResult, StorageError};
pub use models::{Credential, Identity, RestoreOutcome, Session, SessionStatus, UserId};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::SessionStore;
