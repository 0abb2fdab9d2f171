//! Broadcast bus for audit events.

use reconcile_types::AuditEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Fan-out channel shared by the registry and every provider.
///
/// Publishing never blocks and succeeds with no subscribers. A subscriber
/// that falls more than `capacity` events behind observes a lag error on
/// its receiver and skips ahead.
#[derive(Debug, Clone)]
pub struct AuditBus {
    sender: broadcast::Sender<AuditEvent>,
}

impl AuditBus {
    /// Default number of buffered events per subscriber.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Creates a bus buffering up to `capacity` events (at least one).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publishes an event to all current subscribers.
    pub fn publish(&self, event: AuditEvent) {
        debug!(event = event.name(), subscribers = self.subscriber_count(), "audit event");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }
}

impl Default for AuditBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
