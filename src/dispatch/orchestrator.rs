//! Dispatch orchestration: rate check, fast path, queued or inline.

use super::{
    BrokerState, ConnectionState, DispatchMode, Dispatcher, InlineDispatcher, JobQueue, JobRunner,
    QueuedDispatcher, RateLimiter,
};
use crate::delivery::DeliveryChannel;
use crate::models::{BroadcastEvent, VerificationJob};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// What happened to a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Dropped by the rate limiter. Nothing is emitted for it.
    Rejected,
    /// Answered immediately without running a job (cache hits, no claims).
    Delivered,
    /// Pushed to the durable queue.
    Queued,
    /// Running in this process.
    Inline,
}

impl DispatchOutcome {
    /// Returns the outcome as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rejected => "rejected",
            Self::Delivered => "direct",
            Self::Queued => DispatchMode::Queued.as_str(),
            Self::Inline => DispatchMode::Inline.as_str(),
        }
    }
}

/// Dispatch counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Jobs submitted.
    pub received: u64,
    /// Jobs dropped by the rate limiter.
    pub rejected: u64,
    /// Jobs answered on the fast path.
    pub delivered_direct: u64,
    /// Jobs pushed to the durable queue.
    pub queued: u64,
    /// Jobs run in this process.
    pub inline: u64,
    /// Whether the broker is currently considered reachable.
    pub broker_up: bool,
}

#[derive(Default)]
struct Counters {
    received: AtomicU64,
    rejected: AtomicU64,
    delivered_direct: AtomicU64,
    queued: AtomicU64,
    inline: AtomicU64,
}

/// Accepts verification requests and routes them.
///
/// ```text
/// RECEIVED -> RATE_CHECK -> REJECTED
///                        -> fast path -> DELIVERED
///                        -> QUEUED   (broker up, push succeeded)
///                        -> INLINE   (broker down, or push failed)
/// ```
///
/// A failed push marks the broker down and the same job runs inline, so a
/// broker outage never loses a request.
pub struct DispatchOrchestrator {
    limiter: Arc<RateLimiter>,
    connection: Arc<ConnectionState>,
    runner: Arc<dyn JobRunner>,
    delivery: Arc<dyn DeliveryChannel>,
    queue: Option<Arc<dyn JobQueue>>,
    queued: Option<QueuedDispatcher>,
    inline: InlineDispatcher,
    counters: Counters,
}

impl DispatchOrchestrator {
    /// Creates an orchestrator that runs every job inline.
    #[must_use]
    pub fn new(
        limiter: Arc<RateLimiter>,
        runner: Arc<dyn JobRunner>,
        delivery: Arc<dyn DeliveryChannel>,
    ) -> Self {
        let inline = InlineDispatcher::new(Arc::clone(&runner), Arc::clone(&delivery));
        Self {
            limiter,
            connection: Arc::new(ConnectionState::new()),
            runner,
            delivery,
            queue: None,
            queued: None,
            inline,
            counters: Counters::default(),
        }
    }

    /// Adds a durable queue. The broker stays `Down` until [`Self::connect`].
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queued = Some(QueuedDispatcher::new(Arc::clone(&queue)));
        self.queue = Some(queue);
        self
    }

    /// Probes the broker and requeues jobs orphaned by a previous run.
    pub async fn connect(&self) -> BrokerState {
        let Some(queue) = &self.queue else {
            tracing::info!("No job broker configured, running jobs inline");
            return BrokerState::Down;
        };
        match queue.ping().await {
            Ok(()) => {
                if self.connection.mark_up() {
                    self.delivery
                        .broadcast(BroadcastEvent::BrokerStateChanged { up: true });
                }
                if let Err(e) = queue.recover().await {
                    tracing::warn!(error = %e, "Failed to requeue orphaned jobs");
                }
            },
            Err(e) => {
                if self.connection.mark_down(&e.to_string()) {
                    self.delivery
                        .broadcast(BroadcastEvent::BrokerStateChanged { up: false });
                }
            },
        }
        self.connection.state()
    }

    /// Routes one verification request.
    #[tracing::instrument(skip(self, job), fields(session_id = %job.session_id, job_id = %job.id))]
    pub async fn submit(&self, job: VerificationJob) -> DispatchOutcome {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let outcome = self.route(job).await;
        let counter = match outcome {
            DispatchOutcome::Rejected => &self.counters.rejected,
            DispatchOutcome::Delivered => &self.counters.delivered_direct,
            DispatchOutcome::Queued => &self.counters.queued,
            DispatchOutcome::Inline => &self.counters.inline,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dispatch_total", "mode" => outcome.as_str()).increment(1);
        tracing::debug!(outcome = outcome.as_str(), "Job dispatched");
        outcome
    }

    async fn route(&self, job: VerificationJob) -> DispatchOutcome {
        if !self.limiter.allow(&job.session_id) {
            return DispatchOutcome::Rejected;
        }

        if let Some(event) = self.runner.fast_path(&job) {
            self.delivery.deliver(&job.session_id, event);
            return DispatchOutcome::Delivered;
        }

        if let Some(queued) = self.queued.as_ref().filter(|_| self.connection.is_up()) {
            match queued.dispatch(job.clone()).await {
                Ok(()) => return DispatchOutcome::Queued,
                Err(e) => {
                    if self.connection.mark_down(&e.to_string()) {
                        self.delivery
                            .broadcast(BroadcastEvent::BrokerStateChanged { up: false });
                    }
                },
            }
        }

        match self.inline.dispatch(job).await {
            Ok(()) => DispatchOutcome::Inline,
            Err(e) => {
                // Inline dispatch only spawns; this is unreachable in practice.
                tracing::error!(error = %e, "Inline dispatch failed");
                DispatchOutcome::Inline
            },
        }
    }

    /// Shared broker connection state.
    #[must_use]
    pub fn connection(&self) -> Arc<ConnectionState> {
        Arc::clone(&self.connection)
    }

    /// The durable queue, if configured.
    #[must_use]
    pub fn queue(&self) -> Option<Arc<dyn JobQueue>> {
        self.queue.clone()
    }

    /// The rate limiter.
    #[must_use]
    pub const fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Snapshot of the dispatch counters.
    #[must_use]
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            received: self.counters.received.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            delivered_direct: self.counters.delivered_direct.load(Ordering::Relaxed),
            queued: self.counters.queued.load(Ordering::Relaxed),
            inline: self.counters.inline.load(Ordering::Relaxed),
            broker_up: self.connection.is_up(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{MemoryQueue, RecordingDelivery, ScriptedRunner};
    use crate::models::{JobKind, SessionEvent};
    use std::time::Duration;

    fn job(session: &str) -> VerificationJob {
        VerificationJob::new(session, "The Eiffel Tower is in Paris.", vec![], JobKind::Transcript)
    }

    fn orchestrator(
        runner: Arc<ScriptedRunner>,
        delivery: Arc<RecordingDelivery>,
    ) -> DispatchOrchestrator {
        DispatchOrchestrator::new(
            Arc::new(RateLimiter::new(5, Duration::from_secs(60))),
            runner,
            delivery,
        )
    }

    #[tokio::test]
    async fn test_inline_when_no_broker() {
        let runner = Arc::new(ScriptedRunner::succeeding());
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::clone(&runner), Arc::clone(&delivery));

        assert_eq!(orchestrator.connect().await, BrokerState::Down);
        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Inline);

        let events = delivery.wait_for(1).await;
        assert!(matches!(events[0].1, SessionEvent::ClaimsVerified { .. }));
        assert_eq!(orchestrator.stats().inline, 1);
    }

    #[tokio::test]
    async fn test_sixth_request_is_rejected_without_emission() {
        let runner = Arc::new(ScriptedRunner::succeeding());
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::clone(&runner), Arc::clone(&delivery));

        for _ in 0..5 {
            assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Inline);
        }
        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Rejected);

        delivery.wait_for(5).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(delivery.events().len(), 5);
        assert_eq!(orchestrator.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_fast_path_delivers_directly() {
        let runner = Arc::new(ScriptedRunner::succeeding().with_fast_path());
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::clone(&runner), Arc::clone(&delivery));

        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Delivered);
        assert_eq!(delivery.events().len(), 1);
        assert_eq!(runner.runs(), 0);
    }

    #[tokio::test]
    async fn test_queued_when_broker_up() {
        let queue = Arc::new(MemoryQueue::default());
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::new(ScriptedRunner::succeeding()), Arc::clone(&delivery))
            .with_queue(Arc::clone(&queue) as Arc<dyn JobQueue>);

        assert_eq!(orchestrator.connect().await, BrokerState::Up);
        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Queued);
        assert_eq!(queue.pending_len(), 1);
        assert!(delivery.events().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_falls_back_to_inline_and_marks_down() {
        let queue = Arc::new(MemoryQueue::default());
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::new(ScriptedRunner::succeeding()), Arc::clone(&delivery))
            .with_queue(Arc::clone(&queue) as Arc<dyn JobQueue>);
        orchestrator.connect().await;

        queue.set_available(false);
        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Inline);
        assert_eq!(orchestrator.connection().state(), BrokerState::Down);

        let events = delivery.wait_for(1).await;
        assert_eq!(events[0].0, "s1");
        assert!(delivery.broadcasts().contains(&false));
    }

    #[tokio::test]
    async fn test_unreachable_broker_at_startup() {
        let queue = Arc::new(MemoryQueue::default());
        queue.set_available(false);
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(Arc::new(ScriptedRunner::succeeding()), Arc::clone(&delivery))
            .with_queue(queue);

        assert_eq!(orchestrator.connect().await, BrokerState::Down);
        assert_eq!(orchestrator.submit(job("s1")).await, DispatchOutcome::Inline);
    }

    #[tokio::test]
    async fn test_inline_failure_emits_error_event() {
        let runner = Arc::new(ScriptedRunner::failing(u32::MAX));
        let delivery = Arc::new(RecordingDelivery::default());
        let orchestrator = orchestrator(runner, Arc::clone(&delivery));

        orchestrator.submit(job("s1")).await;
        let events = delivery.wait_for(1).await;
        assert!(matches!(
            events[0].1,
            SessionEvent::VerificationError { attempts: 1, .. }
        ));
    }
}
