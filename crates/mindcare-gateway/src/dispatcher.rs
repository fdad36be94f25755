use tokio::sync::broadcast;

use mindcare_types::events::GatewayEvent;

/// Fans gateway events out to every connected client. Room scoping is
/// decided per connection: each connection filters room-scoped events
/// against its own membership set, so membership dies with the socket.
#[derive(Clone)]
pub struct Dispatcher {
    broadcast_tx: broadcast::Sender<GatewayEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self { broadcast_tx }
    }

    /// Subscribe to gateway events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Publish an event to all connected clients. Delivery is best-effort:
    /// a client connecting afterwards never sees it and must re-fetch over HTTP.
    pub fn broadcast(&self, event: GatewayEvent) {
        let _ = self.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindcare_types::api::ThreadSummary;
    use uuid::Uuid;

    fn sample_thread_event() -> GatewayEvent {
        GatewayEvent::ThreadCreated {
            thread: ThreadSummary {
                id: Uuid::new_v4(),
                title: "Homesick".into(),
                category: "General".into(),
                author_name: "Asha".into(),
                body: "...".into(),
                created_at: chrono::Utc::now(),
                reply_count: 0,
            },
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let dispatcher = Dispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        dispatcher.broadcast(sample_thread_event());

        assert!(matches!(rx1.recv().await.unwrap(), GatewayEvent::ThreadCreated { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), GatewayEvent::ThreadCreated { .. }));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let dispatcher = Dispatcher::new();
        dispatcher.broadcast(sample_thread_event());

        let mut rx = dispatcher.subscribe();
        assert!(rx.try_recv().is_err());
    }
}
