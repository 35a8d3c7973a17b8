//! # FIPP21
//!
//! Client-side building blocks for the FIPP21 blackjack platform.
//!
//! All authoritative game state (dealing, scoring, turn order, balances) lives
//! behind a remote HTTP API. This crate provides the pieces a client needs to
//! talk to it:
//!
//! - [`session`]: the session store that restores, signs in and signs out,
//!   persisting the credential and identity to durable client storage.
//! - [`realtime`]: a single-connection push-notification dispatcher that fans
//!   named events out to subscribers and reconnects with backoff.
//! - [`api`]: a typed client for the remote HTTP API that attaches the bearer
//!   credential to every request.
//! - [`config`]: client configuration loaded from the environment.
//!
//! ## Example
//!
//! ```no_run
//! use fipp21::{ApiClient, Dispatcher, MemoryStorage, ReconnectPolicy, SessionStore};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let api = ApiClient::new("http://localhost:5000".to_string());
//! let mut session = SessionStore::new(api.clone(), MemoryStorage::default());
//! session.restore();
//! session.sign_in("a@b.com", "secret").await?;
//!
//! let dispatcher = Dispatcher::new("ws://localhost:5000", ReconnectPolicy::default());
//! let subscription = dispatcher.on("estado_atualizado", |frame| {
//!     println!("state changed: {}", frame.payload);
//! });
//! dispatcher.connect();
//! // ...
//! dispatcher.off("estado_atualizado", &subscription);
//! dispatcher.disconnect();
//! # Ok(())
//! # }
//! ```

/// Typed client for the remote HTTP API.
pub mod api;
pub use api::{ApiClient, ApiError};

/// Client configuration.
pub mod config;
pub use config::{ClientConfig, ConfigError};

/// Push-notification connection and subscription registry.
pub mod realtime;
pub use realtime::{ConnectionState, Dispatcher, Frame, ReconnectPolicy, Subscription};

/// Authenticated session lifecycle and persistence.
pub mod session;
pub use session::{
    Credential, FileStorage, Identity, MemoryStorage, RestoreOutcome, SessionError, SessionStore,
    Storage,
};
