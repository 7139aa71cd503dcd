//! Broadcast fan-out for `AlertEvent`s.

use shelfcall_core::events::AlertEvent;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// Cloneable publisher for engine events.
///
/// Publishing never fails; events sent with no subscribers are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AlertEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: AlertEvent) {
        tracing::trace!(event = event.event_name(), "Publishing event");
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.sender.subscribe()
    }
}
