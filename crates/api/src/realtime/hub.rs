//! In-process fan-out of bridge events.

use tokio::sync::broadcast;
use tracing::trace;

use super::event::BridgeEvent;

/// Events buffered per subscriber before slow receivers start lagging.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast hub: one publisher side (the bridge), any number of subscribers.
///
/// A subscriber that falls more than the channel capacity behind skips the
/// oldest events rather than stalling the bridge.
#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventHub {
    /// Create a hub with the default buffer size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a hub buffering `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: BridgeEvent) -> usize {
        let feed = event.feed;
        // No subscribers is not an error; the event is just dropped.
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(%feed, delivered, "Published bridge event");
        delivered
    }

    /// Subscribe to every future event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Current number of subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
