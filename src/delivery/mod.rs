//! Delivery of results back to live sessions.
//!
//! Every completed job, whether it ran on a queue worker or inline, reaches
//! its session through one [`DeliveryChannel`].

mod registry;

pub use registry::SessionRegistry;

use crate::models::{BroadcastEvent, SessionEvent};
use std::sync::Arc;

/// Pushes events to sessions and aggregate updates to everyone.
pub trait DeliveryChannel: Send + Sync {
    /// Sends an event to one session.
    ///
    /// Returns `false` if the session is gone; the event is dropped.
    fn deliver(&self, session_id: &str, event: SessionEvent) -> bool;

    /// Publishes an aggregate event to all sessions.
    fn broadcast(&self, event: BroadcastEvent);
}

impl<T: DeliveryChannel + ?Sized> DeliveryChannel for Arc<T> {
    fn deliver(&self, session_id: &str, event: SessionEvent) -> bool {
        (**self).deliver(session_id, event)
    }

    fn broadcast(&self, event: BroadcastEvent) {
        (**self).broadcast(event);
    }
}
