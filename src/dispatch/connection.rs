//! Broker connection state.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether the durable broker is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    /// Jobs go to the durable queue.
    Up,
    /// Jobs run inline in this process.
    Down,
}

impl BrokerState {
    /// Returns the state as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for BrokerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide broker availability, read on every dispatch.
///
/// Starts `Down`; the orchestrator probes the broker at startup and the
/// worker pool re-probes while it stays down. Transitions return `true` only
/// when the state actually changed.
#[derive(Debug, Default)]
pub struct ConnectionState {
    up: AtomicBool,
}

impl ConnectionState {
    /// Creates a state that starts `Down`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            up: AtomicBool::new(false),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> BrokerState {
        if self.is_up() {
            BrokerState::Up
        } else {
            BrokerState::Down
        }
    }

    /// Whether the broker is currently considered reachable.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    /// Marks the broker reachable.
    pub fn mark_up(&self) -> bool {
        let changed = !self.up.swap(true, Ordering::AcqRel);
        if changed {
            metrics::gauge!("broker_state").set(1.0);
            tracing::info!("Job broker reachable, dispatching to durable queue");
        }
        changed
    }

    /// Marks the broker unreachable.
    pub fn mark_down(&self, reason: &str) -> bool {
        let changed = self.up.swap(false, Ordering::AcqRel);
        if changed {
            metrics::gauge!("broker_state").set(0.0);
            metrics::counter!("broker_disconnects_total").increment(1);
            tracing::warn!(reason, "Job broker unreachable, falling back to inline execution");
        }
        changed
    }
}
