//! In-process registry of connected sessions.

use super::DeliveryChannel;
use crate::cache::ResultCache;
use crate::models::{AggregateStats, BroadcastEvent, SessionEvent, Verdict};
use crate::observability::{EventBus, StatsReceiver};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};

type SessionMap = HashMap<String, mpsc::UnboundedSender<SessionEvent>>;

/// Routes events to connected sessions and keeps aggregate tallies.
///
/// Each session owns the receiving half of an unbounded channel; the server
/// drains it onto the socket. Verdict tallies are updated on every delivered
/// result and published on the [`EventBus`] as
/// [`BroadcastEvent::StatsUpdated`].
pub struct SessionRegistry {
    sessions: RwLock<SessionMap>,
    tally: Mutex<Tally>,
    bus: EventBus,
    cache: Option<Arc<ResultCache>>,
}

#[derive(Default)]
struct Tally {
    claims_verified: u64,
    verdicts: BTreeMap<String, u64>,
}

impl SessionRegistry {
    /// Creates a registry publishing on the given bus.
    #[must_use]
    pub fn new(bus: EventBus) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            tally: Mutex::new(Tally::default()),
            bus,
            cache: None,
        }
    }

    /// Includes the cache hit rate in published statistics.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers a session and returns its event stream.
    ///
    /// Registering an existing id replaces the previous stream.
    pub fn register(&self, session_id: &str) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let count = {
            let mut sessions = self.write();
            sessions.insert(session_id.to_string(), tx);
            sessions.len()
        };
        metrics::gauge!("active_sessions").set(count as f64);
        tracing::info!(session_id, active = count, "Session registered");
        self.publish_stats();
        rx
    }

    /// Removes a session. Pending events for it are dropped.
    pub fn unregister(&self, session_id: &str) {
        let count = {
            let mut sessions = self.write();
            sessions.remove(session_id);
            sessions.len()
        };
        metrics::gauge!("active_sessions").set(count as f64);
        tracing::info!(session_id, active = count, "Session unregistered");
        self.publish_stats();
    }

    /// Number of connected sessions.
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.read().len()
    }

    /// Subscribes to aggregate events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.bus.subscribe()
    }

    /// Subscribes to aggregate statistics updates only.
    #[must_use]
    pub fn subscribe_stats(&self) -> StatsReceiver {
        self.bus.subscribe_stats()
    }

    /// Current aggregate statistics.
    #[must_use]
    pub fn snapshot(&self) -> AggregateStats {
        let (claims_verified, verdicts) = {
            let tally = self.tally();
            (tally.claims_verified, tally.verdicts.clone())
        };
        AggregateStats {
            claims_verified,
            verdicts,
            cache_hit_rate: self.cache.as_ref().map_or(0.0, |c| c.stats().hit_rate),
            active_sessions: self.active_sessions(),
        }
    }

    fn record(&self, event: &SessionEvent) -> bool {
        let verdicts: Vec<Verdict> = match event {
            SessionEvent::ClaimsVerified { claims, .. } => {
                claims.iter().map(|result| result.verdict).collect()
            },
            SessionEvent::ClaimResult { verdict, .. } => vec![*verdict],
            _ => return false,
        };
        if verdicts.is_empty() {
            return false;
        }
        let mut tally = self.tally();
        for verdict in verdicts {
            tally.claims_verified += 1;
            *tally.verdicts.entry(verdict.as_str().to_string()).or_insert(0) += 1;
        }
        true
    }

    fn publish_stats(&self) {
        self.bus.publish(BroadcastEvent::StatsUpdated(self.snapshot()));
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionMap> {
        self.sessions
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionMap> {
        self.sessions
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn tally(&self) -> std::sync::MutexGuard<'_, Tally> {
        self.tally
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}

impl DeliveryChannel for SessionRegistry {
    fn deliver(&self, session_id: &str, event: SessionEvent) -> bool {
        let event_type = event.event_type();
        let tallied = self.record(&event);

        let sender = self.read().get(session_id).cloned();
        let delivered = sender.is_some_and(|tx| tx.send(event).is_ok());
        if delivered {
            metrics::counter!("events_delivered_total", "event" => event_type).increment(1);
        } else {
            metrics::counter!("events_dropped_total", "event" => event_type).increment(1);
            tracing::debug!(session_id, event_type, "Session gone, dropping event");
        }

        if tallied {
            self.publish_stats();
        }
        delivered
    }

    fn broadcast(&self, event: BroadcastEvent) {
        self.bus.publish(event);
    }
}
