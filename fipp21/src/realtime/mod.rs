//! Realtime push notifications.
//!
//! A [`Dispatcher`] owns a single WebSocket connection to the push endpoint
//! and a registry of named-event subscribers. Each incoming frame is parsed
//! as JSON, its event type read from `type` (or the legacy `event` field),
//! and every subscriber for that type is invoked in registration order.
//!
//! Frames are triggers, not state: subscribers typically re-fetch from the
//! HTTP API. Nothing is buffered across reconnects.
//!
//! ## Example
//!
//! ```no_run
//! use fipp21::realtime::{Dispatcher, ReconnectPolicy, events};
//!
//! # async fn run() {
//! let dispatcher = Dispatcher::new("ws://localhost:5000", ReconnectPolicy::default());
//! let joined = dispatcher.on(events::PARTICIPANT_JOINED, |frame| {
//!     println!("someone joined: {}", frame.payload);
//! });
//! dispatcher.connect();
//!
//! // Leaving the room view:
//! dispatcher.off(events::PARTICIPANT_JOINED, &joined);
//! dispatcher.disconnect();
//! # }
//! ```

pub mod backoff;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod frame;
pub mod registry;

pub use backoff::{Backoff, ReconnectPolicy};
pub use dispatcher::{ConnectionState, Dispatcher, DispatcherConfig};
pub use errors::{FrameError, TransportError};
pub use frame::Frame;
pub use registry::{Callback, Subscription, SubscriptionRegistry};
