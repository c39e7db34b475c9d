//! Per-session sliding-window rate limiting.

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sliding-window limiter keyed by session id.
///
/// A request is allowed only if fewer than `max_requests` earlier allowed
/// requests fall within the trailing `window`. Rejected requests are not
/// recorded. State is local to this process.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    sessions: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Checks and records a request for the session.
    pub fn allow(&self, session_id: &str) -> bool {
        self.allow_at(session_id, Instant::now())
    }

    pub(crate) fn allow_at(&self, session_id: &str, now: Instant) -> bool {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let timestamps = sessions.entry(session_id.to_string()).or_default();
        Self::prune(timestamps, now, self.window);

        if timestamps.len() < self.max_requests {
            timestamps.push_back(now);
            true
        } else {
            drop(sessions);
            metrics::counter!("rate_limit_rejections_total").increment(1);
            tracing::debug!(session_id, "Rate limit exceeded, dropping request");
            false
        }
    }

    /// Removes sessions whose whole window has expired. Returns the number removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, timestamps| {
            Self::prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        let removed = before - sessions.len();
        metrics::gauge!("rate_limit_sessions").set(sessions.len() as f64);
        removed
    }

    /// Forgets a session, for example when it disconnects.
    pub fn remove_session(&self, session_id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(session_id);
    }

    /// Number of tracked sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while timestamps
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= window)
        {
            timestamps.pop_front();
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
