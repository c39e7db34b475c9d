//! Collaborator resilience: circuit breaking and rate-limit cooldowns.
//!
//! Each collaborator gets one [`ProviderGuard`]. A guard skips calls while its
//! breaker is open or while a cooldown entered on [`Error::RateLimited`] is
//! still running, so a throttling collaborator is not hammered by every claim.

use super::{Assessment, EvidenceSource, ReasoningRequest, ReasoningService};
use crate::config::ResilienceConfig;
use crate::models::EvidenceItem;
use crate::{Error, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Guard thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardConfig {
    /// Consecutive failures before opening the circuit.
    pub failure_threshold: u32,
    /// How long to keep the circuit open before half-open.
    pub reset_timeout: Duration,
    /// Maximum trial calls while half-open.
    pub half_open_max_calls: u32,
    /// Cooldown after a rate-limit signal without `Retry-After`.
    pub cooldown: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::from(&ResilienceConfig::default())
    }
}

impl From<&ResilienceConfig> for GuardConfig {
    fn from(config: &ResilienceConfig) -> Self {
        Self {
            failure_threshold: config.breaker_failure_threshold.max(1),
            reset_timeout: Duration::from_millis(config.breaker_reset_ms),
            half_open_max_calls: 1,
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerStatus {
    /// Calls flow normally.
    Closed,
    /// Calls are rejected.
    Open,
    /// A limited number of trial calls are let through.
    HalfOpen,
}

impl BreakerStatus {
    const fn gauge_value(self) -> f64 {
        match self {
            Self::Closed => 0.0,
            Self::Open => 1.0,
            Self::HalfOpen => 2.0,
        }
    }
}

/// Circuit breaker state machine.
#[derive(Debug)]
enum BreakerState {
    Closed { failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { attempts: u32 },
}

#[derive(Debug)]
struct CircuitBreaker {
    state: BreakerState,
    failure_threshold: u32,
    reset_timeout: Duration,
    half_open_max_calls: u32,
}

impl CircuitBreaker {
    const fn new(config: &GuardConfig) -> Self {
        Self {
            state: BreakerState::Closed { failures: 0 },
            failure_threshold: config.failure_threshold,
            reset_timeout: config.reset_timeout,
            half_open_max_calls: config.half_open_max_calls,
        }
    }

    fn allow(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed { .. } => true,
            BreakerState::Open { opened_at } => {
                if now.saturating_duration_since(opened_at) >= self.reset_timeout {
                    self.state = BreakerState::HalfOpen { attempts: 1 };
                    true
                } else {
                    false
                }
            },
            BreakerState::HalfOpen { ref mut attempts } => {
                if *attempts >= self.half_open_max_calls {
                    false
                } else {
                    *attempts += 1;
                    true
                }
            },
        }
    }

    const fn on_success(&mut self) {
        self.state = BreakerState::Closed { failures: 0 };
    }

    /// Records a failure; returns whether the breaker tripped open.
    fn on_failure(&mut self, now: Instant) -> bool {
        match self.state {
            BreakerState::Closed { ref mut failures } => {
                *failures += 1;
                if *failures >= self.failure_threshold {
                    self.state = BreakerState::Open { opened_at: now };
                    return true;
                }
            },
            BreakerState::HalfOpen { .. } => {
                self.state = BreakerState::Open { opened_at: now };
                return true;
            },
            BreakerState::Open { .. } => {},
        }
        false
    }

    const fn status(&self) -> BreakerStatus {
        match self.state {
            BreakerState::Closed { .. } => BreakerStatus::Closed,
            BreakerState::Open { .. } => BreakerStatus::Open,
            BreakerState::HalfOpen { .. } => BreakerStatus::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct GuardState {
    breaker: CircuitBreaker,
    cooldown_until: Option<Instant>,
}

/// Circuit breaker plus rate-limit cooldown for one collaborator.
#[derive(Debug)]
pub struct ProviderGuard {
    provider: &'static str,
    config: GuardConfig,
    state: Mutex<GuardState>,
}

impl ProviderGuard {
    /// Creates a guard for the named collaborator.
    #[must_use]
    pub const fn new(provider: &'static str, config: GuardConfig) -> Self {
        Self {
            provider,
            config,
            state: Mutex::new(GuardState {
                breaker: CircuitBreaker::new(&config),
                cooldown_until: None,
            }),
        }
    }

    /// The guarded collaborator's name.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Current breaker state.
    #[must_use]
    pub fn status(&self) -> BreakerStatus {
        self.lock().breaker.status()
    }

    /// Whether a rate-limit cooldown is running.
    #[must_use]
    pub fn is_cooling_down(&self) -> bool {
        self.cooling_down_at(Instant::now())
    }

    fn cooling_down_at(&self, now: Instant) -> bool {
        self.lock().cooldown_until.is_some_and(|until| now < until)
    }

    /// Runs `call` unless the collaborator is cooling down or its circuit is
    /// open, and records the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProviderUnavailable`] when the call is skipped, or the
    /// error returned by `call`.
    pub fn call<T>(&self, call: impl FnOnce() -> Result<T>) -> Result<T> {
        self.call_at(Instant::now(), call)
    }

    pub(crate) fn call_at<T>(&self, now: Instant, call: impl FnOnce() -> Result<T>) -> Result<T> {
        self.admit(now)?;

        let started = Instant::now();
        let result = call();
        let elapsed = started.elapsed();

        let status = match &result {
            Ok(_) => {
                self.record_success();
                "success"
            },
            Err(Error::RateLimited {
                retry_after_secs, ..
            }) => {
                self.enter_cooldown(now, *retry_after_secs);
                "rate_limited"
            },
            Err(err) => {
                self.record_failure(now, err);
                "error"
            },
        };

        metrics::counter!(
            "provider_requests_total",
            "provider" => self.provider,
            "status" => status
        )
        .increment(1);
        metrics::histogram!(
            "provider_request_duration_ms",
            "provider" => self.provider,
            "status" => status
        )
        .record(elapsed.as_secs_f64() * 1000.0);

        result
    }

    fn admit(&self, now: Instant) -> Result<()> {
        let mut state = self.lock();
        let cooldown_until = state.cooldown_until;
        if let Some(until) = cooldown_until {
            if now < until {
                drop(state);
                self.record_skip("cooldown");
                return Err(self.unavailable("cooling down after rate limit"));
            }
            state.cooldown_until = None;
        }

        let allowed = state.breaker.allow(now);
        let status = state.breaker.status();
        drop(state);
        self.record_breaker_state(status);

        if allowed {
            Ok(())
        } else {
            self.record_skip("circuit_open");
            Err(self.unavailable("circuit breaker open"))
        }
    }

    fn record_success(&self) {
        let mut state = self.lock();
        state.breaker.on_success();
        let status = state.breaker.status();
        drop(state);
        self.record_breaker_state(status);
    }

    fn record_failure(&self, now: Instant, err: &Error) {
        let mut state = self.lock();
        let tripped = state.breaker.on_failure(now);
        let status = state.breaker.status();
        drop(state);
        self.record_breaker_state(status);

        if tripped {
            metrics::counter!("provider_circuit_breaker_trips_total", "provider" => self.provider)
                .increment(1);
            tracing::warn!(provider = self.provider, error = %err, "Circuit breaker opened");
        }
    }

    fn enter_cooldown(&self, now: Instant, retry_after_secs: Option<u64>) {
        let cooldown = retry_after_secs.map_or(self.config.cooldown, Duration::from_secs);
        self.lock().cooldown_until = Some(now + cooldown);
        metrics::counter!("provider_cooldowns_total", "provider" => self.provider).increment(1);
        tracing::warn!(
            provider = self.provider,
            cooldown_secs = cooldown.as_secs(),
            "Collaborator rate limited, entering cooldown"
        );
    }

    fn record_skip(&self, reason: &'static str) {
        metrics::counter!(
            "provider_requests_total",
            "provider" => self.provider,
            "status" => reason
        )
        .increment(1);
        tracing::debug!(provider = self.provider, reason, "Skipping collaborator call");
    }

    fn record_breaker_state(&self, status: BreakerStatus) {
        metrics::gauge!("provider_circuit_breaker_state", "provider" => self.provider)
            .set(status.gauge_value());
    }

    fn unavailable(&self, reason: &str) -> Error {
        Error::ProviderUnavailable {
            provider: self.provider.to_string(),
            reason: reason.to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GuardState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Evidence source wrapped in a [`ProviderGuard`].
pub struct GuardedSource<S: EvidenceSource> {
    inner: S,
    guard: ProviderGuard,
}

impl<S: EvidenceSource> GuardedSource<S> {
    /// Wraps a source.
    #[must_use]
    pub fn new(inner: S, config: GuardConfig) -> Self {
        let guard = ProviderGuard::new(inner.name(), config);
        Self { inner, guard }
    }

    /// The guard protecting the source.
    #[must_use]
    pub const fn guard(&self) -> &ProviderGuard {
        &self.guard
    }
}

impl<S: EvidenceSource> EvidenceSource for GuardedSource<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        self.guard.call(|| self.inner.search(query, limit))
    }
}

/// Reasoning service wrapped in a [`ProviderGuard`].
pub struct GuardedReasoner<R: ReasoningService> {
    inner: R,
    guard: ProviderGuard,
}

impl<R: ReasoningService> GuardedReasoner<R> {
    /// Wraps a reasoning service.
    #[must_use]
    pub fn new(inner: R, config: GuardConfig) -> Self {
        let guard = ProviderGuard::new(inner.name(), config);
        Self { inner, guard }
    }

    /// The guard protecting the service.
    #[must_use]
    pub const fn guard(&self) -> &ProviderGuard {
        &self.guard
    }
}

impl<R: ReasoningService> ReasoningService for GuardedReasoner<R> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn assess(&self, request: &ReasoningRequest) -> Result<Assessment> {
        self.guard.call(|| self.inner.assess(request))
    }
}
