//! In-process change notifications.
//!
//! Store mutations publish a [`ChangeEvent`] here; the `/api/events` route
//! forwards them to subscribed clients as an SSE stream. A subscription is a
//! plain broadcast receiver, so unsubscribing is dropping the stream, and a
//! publish with nobody listening is a no-op rather than an error.
//!
//! Delivery is best effort: a slow subscriber that falls more than the
//! channel capacity behind loses the oldest events and should re-query the
//! views it cares about.

use payloads::responses::ChangeEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // send only fails when there are no subscribers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
