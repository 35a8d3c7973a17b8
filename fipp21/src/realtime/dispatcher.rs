//! WebSocket push-notification dispatcher.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use super::backoff::{Backoff, ReconnectPolicy};
use super::errors::{FrameError, TransportError};
use super::frame::Frame;
use super::registry::{Callback, Subscription, SubscriptionRegistry, deliver};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default limit on the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a graceful close may take before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Frames are flowing
    Open,
    /// Connection dropped; the next attempt starts after `delay`
    Reconnecting { attempt: u32, delay: Duration },
    /// The reconnect policy ran out of attempts
    GaveUp,
    /// Stopped by [`Dispatcher::disconnect`]
    Closed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// Settings for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Push endpoint, e.g. `ws://localhost:5000`
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
    /// Limit on each handshake; `None` leaves it to the transport
    pub connect_timeout: Option<Duration>,
}

impl DispatcherConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        }
    }
}

/// Owns one push connection and fans incoming frames out to subscribers.
///
/// Cloning yields another handle to the same connection and registry.
/// Connection work runs on a Tokio task, so [`connect`](Self::connect) must
/// be called from within a runtime. When the last handle is dropped the
/// connection is shut down.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: DispatcherConfig,
    registry: Mutex<SubscriptionRegistry>,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Link>,
}

/// Per-connection plumbing. `generation` tells a stale task (one that
/// outlived a `disconnect`) not to touch a newer connection's state.
#[derive(Default)]
struct Link {
    generation: u64,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Dispatcher {
    pub fn new(endpoint: impl Into<String>, reconnect: ReconnectPolicy) -> Self {
        Self::from_config(DispatcherConfig {
            reconnect,
            ..DispatcherConfig::new(endpoint)
        })
    }

    pub fn from_config(config: DispatcherConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Mutex::new(SubscriptionRegistry::new()),
                state,
                link: Mutex::new(Link::default()),
            }),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.config.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Open the connection unless one is already live.
    ///
    /// Returns immediately; watch [`state_changes`](Self::state_changes) for
    /// [`ConnectionState::Open`]. A connection that is connecting, open, or
    /// waiting to reconnect counts as live.
    pub fn connect(&self) {
        let mut link = locked(&self.inner.link);
        if let Some(task) = &link.task
            && !task.is_finished()
        {
            tracing::debug!(endpoint = %self.endpoint(), "Connect ignored, connection already live");
            return;
        }

        link.generation += 1;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        link.shutdown = Some(shutdown_tx);
        link.outbound = None;
        self.inner.state.send_replace(ConnectionState::Connecting);

        let task = tokio::spawn(run_connection(
            Arc::downgrade(&self.inner),
            link.generation,
            self.inner.config.clone(),
            shutdown_rx,
        ));
        link.task = Some(task);
    }

    /// Close the connection and cancel any scheduled reconnect.
    ///
    /// No further attempt is made until [`connect`](Self::connect) is called
    /// again. Subscriptions are kept.
    pub fn disconnect(&self) {
        {
            let mut link = locked(&self.inner.link);
            link.generation += 1;
            link.outbound = None;
            if let Some(shutdown) = link.shutdown.take() {
                let _ = shutdown.send(());
            }
            link.task = None;
        }
        self.inner.state.send_replace(ConnectionState::Closed);
        tracing::info!(endpoint = %self.endpoint(), "Push connection closed by client");
    }

    /// Register `callback` for frames whose event type is `event_type`.
    ///
    /// Registrations accumulate. Callbacks run in registration order on the
    /// connection task and must not block.
    pub fn on<F>(&self, event_type: &str, callback: F) -> Subscription
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        locked(&self.inner.registry).insert(event_type, callback)
    }

    /// Remove one registration. Unknown registrations are ignored.
    pub fn off(&self, event_type: &str, subscription: &Subscription) {
        if !locked(&self.inner.registry).remove(event_type, subscription) {
            tracing::debug!(event_type, "Unsubscribe ignored, not registered");
        }
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        locked(&self.inner.registry).subscriber_count(event_type)
    }

    /// Serialize `payload` and write it if the connection is open.
    ///
    /// Sends while not open are dropped, not queued. Returns whether the
    /// message was handed to the connection.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize outbound message: {}", e);
                return false;
            }
        };

        let link = locked(&self.inner.link);
        match (&link.outbound, self.state().is_open()) {
            (Some(outbound), true) => outbound.send(Message::Text(json.into())).is_ok(),
            _ => {
                tracing::debug!("Dropping outbound message, connection not open");
                false
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("endpoint", &self.endpoint())
            .field("state", &self.state())
            .field("registry", &*locked(&self.inner.registry))
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let link = self.link.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(shutdown) = link.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Apply `f` if the dispatcher still exists and `generation` is current.
/// Returns `None` when the task should stop.
fn with_current<R>(
    weak: &Weak<Inner>,
    generation: u64,
    f: impl FnOnce(&Inner, &mut Link) -> R,
) -> Option<R> {
    let inner = weak.upgrade()?;
    let mut link = locked(&inner.link);
    if link.generation != generation {
        return None;
    }
    Some(f(&inner, &mut link))
}

fn publish(weak: &Weak<Inner>, generation: u64, state: ConnectionState) -> bool {
    with_current(weak, generation, |inner, _| {
        inner.state.send_replace(state);
    })
    .is_some()
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Dropped,
}

async fn run_connection(
    weak: Weak<Inner>,
    generation: u64,
    config: DispatcherConfig,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut backoff = Backoff::new(config.reconnect.clone());

    loop {
        if !publish(&weak, generation, ConnectionState::Connecting) {
            return;
        }

        let attempt = tokio::select! {
            _ = &mut shutdown => return,
            result = open_socket(&config.endpoint, config.connect_timeout) => result,
        };

        match attempt {
            Ok(stream) => {
                tracing::info!(endpoint = %config.endpoint, "Push connection open");
                backoff.reset();
                if run_session(&weak, generation, stream, &mut shutdown).await
                    == SessionEnd::Shutdown
                {
                    return;
                }
                tracing::info!(endpoint = %config.endpoint, "Push connection lost");
            }
            Err(e) => {
                tracing::warn!(endpoint = %config.endpoint, "Push connection failed: {}", e);
            }
        }

        let Some(delay) = backoff.next_delay() else {
            tracing::warn!(
                endpoint = %config.endpoint,
                attempts = backoff.attempts(),
                "Giving up on push connection"
            );
            // Cleared with the final state: connect() after GaveUp starts a new task.
            with_current(&weak, generation, |inner, link| {
                link.task = None;
                link.shutdown = None;
                inner.state.send_replace(ConnectionState::GaveUp);
            });
            return;
        };

        let reconnecting = ConnectionState::Reconnecting {
            attempt: backoff.attempts(),
            delay,
        };
        if !publish(&weak, generation, reconnecting) {
            return;
        }
        tracing::info!(
            attempt = backoff.attempts(),
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn open_socket(
    endpoint: &str,
    connect_timeout: Option<Duration>,
) -> Result<WsStream, TransportError> {
    let (stream, _response) = match connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connect_async(endpoint))
            .await
            .map_err(|_| TransportError::Timeout(limit))??,
        None => connect_async(endpoint).await?,
    };
    Ok(stream)
}

async fn run_session(
    weak: &Weak<Inner>,
    generation: u64,
    stream: WsStream,
    shutdown: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let attached = with_current(weak, generation, |inner, link| {
        link.outbound = Some(outbound_tx);
        inner.state.send_replace(ConnectionState::Open);
    });
    if attached.is_none() {
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
        return SessionEnd::Shutdown;
    }

    let end = loop {
        tokio::select! {
            _ = &mut *shutdown => {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await;
                break SessionEnd::Shutdown;
            }
            Some(message) = outbound_rx.recv() => {
                if let Err(e) = write.send(message).await {
                    tracing::warn!("Push connection write failed: {}", e);
                    break SessionEnd::Dropped;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_frame(weak, Frame::parse(text.as_str())),
                Some(Ok(Message::Binary(bytes))) => handle_frame(weak, Frame::parse_bytes(&bytes)),
                Some(Ok(Message::Close(close))) => {
                    tracing::info!(reason = ?close, "Server closed push connection");
                    break SessionEnd::Dropped;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("Push connection error: {}", e);
                    break SessionEnd::Dropped;
                }
                None => break SessionEnd::Dropped,
            }
        }
    };

    with_current(weak, generation, |_, link| link.outbound = None);
    end
}

fn handle_frame(weak: &Weak<Inner>, parsed: Result<Frame, FrameError>) {
    let frame = match parsed {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Dropping push frame: {}", e);
            return;
        }
    };

    let Some(inner) = weak.upgrade() else {
        return;
    };
    // Snapshot so callbacks can call `on`/`off` without deadlocking.
    let subscribers = locked(&inner.registry).subscribers(frame.event_type());
    drop(inner);

    if subscribers.is_empty() {
        tracing::debug!(event_type = frame.event_type(), "No subscribers for push frame");
        return;
    }
    deliver(&frame, &subscribers);
}
