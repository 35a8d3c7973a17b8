//! Typed access to the remote HTTP API.
//!
//! The API owns every game rule; this client only invokes it. Requests carry
//! `Authorization: Bearer <credential>` whenever a credential is set, and
//! error bodies' `message` field is preserved for display.

pub mod client;
pub mod errors;
pub mod models;

pub use client::ApiClient;
pub use errors::{ApiError, ApiResult};
pub use models::{AuthResponse, Bet, Card, GameState, Participant, Room, RoomId, Round, RoundId};
