//! Host event bus
//!
//! One-to-many broadcast of [`HostEvent`]s. The host actor forwards every
//! event onto the link; tests subscribe directly.

use cuedeck_common::events::HostEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of buffered events before slow receivers start lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// Sender half, for handles that outlive borrows of the bus
    pub fn sender(&self) -> broadcast::Sender<HostEvent> {
        self.tx.clone()
    }

    /// Emit an event; having no subscribers is fine
    pub fn emit(&self, event: HostEvent) {
        trace!("Event: {}", event.event_type());
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
