//! Event-type to subscriber registry.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::frame::Frame;

/// Subscriber callback. Must not block: it runs on the connection task.
pub type Callback = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Handle returned by a registration, used to remove exactly that one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Subscribers grouped by event type, each group in registration order.
#[derive(Default)]
pub struct SubscriptionRegistry {
    next_id: u64,
    entries: HashMap<String, Vec<(Subscription, Callback)>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Registrations accumulate; nothing is replaced.
    pub fn insert(&mut self, event_type: &str, callback: Callback) -> Subscription {
        self.next_id += 1;
        let subscription = Subscription(self.next_id);
        self.entries
            .entry(event_type.to_string())
            .or_default()
            .push((subscription, callback));
        subscription
    }

    /// Remove one registration. Returns false if it was not registered
    /// under `event_type`.
    pub fn remove(&mut self, event_type: &str, subscription: &Subscription) -> bool {
        let Some(group) = self.entries.get_mut(event_type) else {
            return false;
        };
        let before = group.len();
        group.retain(|(s, _)| s != subscription);
        let removed = group.len() != before;
        if group.is_empty() {
            self.entries.remove(event_type);
        }
        removed
    }

    /// Snapshot of the callbacks for `event_type`, in registration order.
    pub fn subscribers(&self, event_type: &str) -> Vec<Callback> {
        self.entries
            .get(event_type)
            .map(|group| group.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, event_type: &str) -> usize {
        self.entries.get(event_type).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Event types with at least one subscriber.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Deliver `frame` to its subscribers. See [`deliver`].
    pub fn dispatch(&self, frame: &Frame) -> usize {
        deliver(frame, &self.subscribers(frame.event_type()))
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("SubscriptionRegistry")
            .field("subscribers", &counts)
            .finish()
    }
}

/// Invoke each callback in order, isolating panics so one failing
/// subscriber does not starve the ones after it.
///
/// Returns how many callbacks completed normally.
pub fn deliver(frame: &Frame, callbacks: &[Callback]) -> usize {
    let mut delivered = 0;
    for (position, callback) in callbacks.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| callback(frame))) {
            Ok(()) => delivered += 1,
            Err(_) => tracing::error!(
                event_type = frame.event_type(),
                position,
                "Subscriber panicked while handling frame"
            ),
        }
    }
    delivered
}
