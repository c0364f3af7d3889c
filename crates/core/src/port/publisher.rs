// Fan-out Publisher Port
//
// State changes are durable before publication is attempted; publishing is
// fire-and-forget and must never fail the underlying mutation.

use crate::domain::QueueSnapshot;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events fanned out to live subscribers (counter panels, status pages)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum QueueEvent {
    /// General queue-update: counters changed (optionally by a reset)
    QueueUpdate(QueueSnapshot),

    /// Queue explicitly paused
    QueuePaused { shop_id: String, pause_state: bool },

    /// Queue explicitly resumed
    QueueResumed { shop_id: String, pause_state: bool },
}

/// Publish seam injected into the engine at construction
pub trait QueuePublisher: Send + Sync {
    /// Best-effort publish; errors (e.g. no subscribers) are swallowed
    fn publish(&self, event: QueueEvent);
}

/// Production publisher backed by a tokio broadcast channel.
///
/// Subscribers that lag are dropped by the channel, not by us; a send into
/// a channel with no receivers is not an error.
pub struct BroadcastPublisher {
    tx: broadcast::Sender<QueueEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// New live subscription; receives events published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(256)
    }
}

impl QueuePublisher for BroadcastPublisher {
    fn publish(&self, event: QueueEvent) {
        // SendError just means nobody is listening right now
        let _ = self.tx.send(event);
    }
}

/// No-op publisher for tests that don't observe events
pub struct NoopPublisher;

impl QueuePublisher for NoopPublisher {
    fn publish(&self, _event: QueueEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_silent() {
        let publisher = BroadcastPublisher::new(8);
        publisher.publish(QueueEvent::QueuePaused {
            shop_id: "shop-1".to_string(),
            pause_state: true,
        });
    }

    #[tokio::test]
    async fn subscriber_sees_events_in_order() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx = publisher.subscribe();

        publisher.publish(QueueEvent::QueuePaused {
            shop_id: "shop-1".to_string(),
            pause_state: true,
        });
        publisher.publish(QueueEvent::QueueResumed {
            shop_id: "shop-1".to_string(),
            pause_state: false,
        });

        assert!(matches!(
            rx.recv().await.unwrap(),
            QueueEvent::QueuePaused { pause_state: true, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            QueueEvent::QueueResumed { pause_state: false, .. }
        ));
    }
}
