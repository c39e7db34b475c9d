//! Tokio broadcast event bus for aggregate updates shared by every session.

use crate::models::{AggregateStats, BroadcastEvent};
use tokio::sync::broadcast;

const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Central event bus for broadcasting aggregate events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BroadcastEvent>,
}

/// Receiver that yields only aggregate statistics updates.
pub struct StatsReceiver {
    receiver: broadcast::Receiver<BroadcastEvent>,
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    pub fn publish(&self, event: BroadcastEvent) {
        metrics::counter!("event_bus_publish_total", "event" => event.event_type()).increment(1);
        let receivers = self.sender.receiver_count();
        metrics::gauge!("event_bus_receivers").set(receivers as f64);
        match self.sender.send(event) {
            Ok(_) => {
                metrics::gauge!("event_bus_queue_depth").set(self.sender.len() as f64);
            },
            Err(_) => {
                // No subscribers.
                metrics::counter!("event_bus_publish_failed_total").increment(1);
            },
        }
    }

    /// Subscribes to the event bus.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        metrics::gauge!("event_bus_receivers").set(self.sender.receiver_count() as f64);
        self.sender.subscribe()
    }

    /// Subscribes to aggregate statistics updates only.
    #[must_use]
    pub fn subscribe_stats(&self) -> StatsReceiver {
        StatsReceiver {
            receiver: self.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl StatsReceiver {
    /// Waits for the next statistics snapshot.
    ///
    /// Other events and lagged updates are skipped; only the latest snapshot
    /// matters. Returns `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<AggregateStats> {
        loop {
            match self.receiver.recv().await {
                Ok(BroadcastEvent::StatsUpdated(stats)) => return Some(stats),
                Ok(BroadcastEvent::BrokerStateChanged { .. }) => {},
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    metrics::counter!("event_bus_lagged_total").increment(skipped);
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
