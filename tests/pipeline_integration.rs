//! End-to-end dispatch scenarios.
//!
//! Wires the real pipeline, session registry, rate limiter, orchestrator and
//! worker pool together, substituting:
//! - an in-memory job queue whose availability can be toggled
//! - a fixed evidence source, so no network is involved

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use async_trait::async_trait;
use claimcheck::config::DispatchConfig;
use claimcheck::delivery::{DeliveryChannel, SessionRegistry};
use claimcheck::dispatch::{
    BrokerState, DispatchOrchestrator, DispatchOutcome, JobQueue, JobRunner, RateLimiter,
    WorkerPool,
};
use claimcheck::evidence::{EvidenceAggregator, EvidenceRetriever, FactOverrideTable, Thresholds};
use claimcheck::models::{BroadcastEvent, EvidenceItem, JobKind, SessionEvent, VerificationJob};
use claimcheck::providers::EvidenceSource;
use claimcheck::{ClaimExtractor, Error, Result, ResultCache, Verdict, VerificationPipeline};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

// ============================================================================
// Test Helpers
// ============================================================================

/// Answers every query with one snippet restating the Eiffel Tower claim.
struct EiffelSource {
    calls: AtomicUsize,
}

impl EvidenceSource for EiffelSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    fn search(&self, _query: &str, _limit: usize) -> Result<Vec<EvidenceItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![EvidenceItem::new(
            "fixture",
            "",
            "https://example.org/eiffel",
            "The Eiffel Tower is in Paris",
        )])
    }
}

/// In-memory stand-in for the durable broker.
#[derive(Default)]
struct MemoryQueue {
    pending: Mutex<VecDeque<VerificationJob>>,
    processing: Mutex<Vec<VerificationJob>>,
    down: AtomicBool,
}

impl MemoryQueue {
    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.down.load(Ordering::SeqCst) {
            Err(Error::QueueUnavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn push(&self, job: &VerificationJob) -> Result<()> {
        self.check()?;
        self.pending.lock().unwrap().push_back(job.clone());
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<VerificationJob>> {
        self.check()?;
        let job = self.pending.lock().unwrap().pop_front();
        if let Some(job) = &job {
            self.processing.lock().unwrap().push(job.clone());
        } else {
            tokio::time::sleep(timeout.min(Duration::from_millis(10))).await;
        }
        Ok(job)
    }

    async fn ack(&self, job: &VerificationJob) -> Result<()> {
        self.check()?;
        self.processing
            .lock()
            .unwrap()
            .retain(|j| !(j.id == job.id && j.attempt == job.attempt));
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.check()
    }

    async fn recover(&self) -> Result<usize> {
        self.check()?;
        let orphaned: Vec<_> = self.processing.lock().unwrap().drain(..).collect();
        let count = orphaned.len();
        self.pending.lock().unwrap().extend(orphaned);
        Ok(count)
    }
}

struct Harness {
    source: Arc<EiffelSource>,
    registry: Arc<SessionRegistry>,
    orchestrator: Arc<DispatchOrchestrator>,
    pipeline: Arc<VerificationPipeline>,
}

fn harness(queue: Option<Arc<MemoryQueue>>) -> Harness {
    let source = Arc::new(EiffelSource {
        calls: AtomicUsize::new(0),
    });
    let pipeline = Arc::new(VerificationPipeline::new(
        ClaimExtractor::default(),
        Arc::new(ResultCache::new(100, Duration::from_secs(3600))),
        EvidenceRetriever::new().with_source(
            Arc::clone(&source) as Arc<dyn EvidenceSource>,
            5,
            Duration::from_secs(2),
        ),
        EvidenceAggregator::new(FactOverrideTable::empty(), Thresholds::default(), 5),
    ));
    let registry = Arc::new(SessionRegistry::default());
    let mut orchestrator = DispatchOrchestrator::new(
        Arc::new(RateLimiter::new(5, Duration::from_secs(60))),
        Arc::clone(&pipeline) as Arc<dyn JobRunner>,
        Arc::clone(&registry) as Arc<dyn DeliveryChannel>,
    );
    if let Some(queue) = queue {
        orchestrator = orchestrator.with_queue(queue as Arc<dyn JobQueue>);
    }
    Harness {
        source,
        registry,
        orchestrator: Arc::new(orchestrator),
        pipeline,
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("session channel closed")
}

fn transcript_job(session_id: &str, text: &str) -> VerificationJob {
    VerificationJob::new(session_id, text, Vec::new(), JobKind::Transcript)
}

fn assert_eiffel_verified(event: &SessionEvent) {
    match event {
        SessionEvent::ClaimsVerified { claims, .. } => {
            assert_eq!(claims.len(), 1);
            assert_eq!(claims[0].verdict, Verdict::True);
            assert!(claims[0].confidence >= 80);
            assert_eq!(claims[0].evidence.len(), 1);
        },
        other => panic!("unexpected event: {other:?}"),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_broker_down_at_startup_runs_inline() {
    let queue = Arc::new(MemoryQueue::default());
    queue.set_down(true);
    let h = harness(Some(Arc::clone(&queue)));
    let mut events = h.registry.register("s1");

    assert_eq!(h.orchestrator.connect().await, BrokerState::Down);
    let outcome = h
        .orchestrator
        .submit(transcript_job("s1", "The Eiffel Tower is in Paris."))
        .await;
    assert_eq!(outcome, DispatchOutcome::Inline);
    assert_eiffel_verified(&next_event(&mut events).await);
}

#[tokio::test]
async fn test_queued_job_processed_by_worker_then_cached() {
    let queue = Arc::new(MemoryQueue::default());
    let h = harness(Some(Arc::clone(&queue)));
    let mut events = h.registry.register("s1");
    assert_eq!(h.orchestrator.connect().await, BrokerState::Up);

    let pool = WorkerPool::new(
        Arc::clone(&queue) as Arc<dyn JobQueue>,
        Arc::clone(&h.pipeline) as Arc<dyn JobRunner>,
        Arc::clone(&h.registry) as Arc<dyn DeliveryChannel>,
        h.orchestrator.connection(),
        DispatchConfig {
            pop_timeout_secs: 1,
            ..DispatchConfig::default()
        },
    );
    let (shutdown, rx) = watch::channel(false);
    let worker = tokio::spawn(pool.run(rx));

    let outcome = h
        .orchestrator
        .submit(transcript_job("s1", "The Eiffel Tower is in Paris."))
        .await;
    assert_eq!(outcome, DispatchOutcome::Queued);
    assert_eiffel_verified(&next_event(&mut events).await);

    // Every claim is cached now, so the same transcript skips the queue.
    let outcome = h
        .orchestrator
        .submit(transcript_job("s1", "The Eiffel Tower is in Paris."))
        .await;
    assert_eq!(outcome, DispatchOutcome::Delivered);
    assert_eiffel_verified(&next_event(&mut events).await);
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 1);

    shutdown.send(true).unwrap();
    worker.await.unwrap();
    assert!(queue.processing.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_broker_failure_mid_session_falls_back_and_broadcasts() {
    let queue = Arc::new(MemoryQueue::default());
    let h = harness(Some(Arc::clone(&queue)));
    let mut events = h.registry.register("s1");
    let mut bus = h.registry.subscribe();
    assert_eq!(h.orchestrator.connect().await, BrokerState::Up);

    queue.set_down(true);
    let outcome = h
        .orchestrator
        .submit(transcript_job("s1", "The Eiffel Tower is in Paris."))
        .await;
    assert_eq!(outcome, DispatchOutcome::Inline);
    assert!(!h.orchestrator.connection().is_up());
    assert_eiffel_verified(&next_event(&mut events).await);

    let mut saw_down = false;
    while let Ok(event) = bus.try_recv() {
        if matches!(event, BroadcastEvent::BrokerStateChanged { up: false }) {
            saw_down = true;
        }
    }
    assert!(saw_down);
}

#[tokio::test]
async fn test_sixth_request_in_window_is_dropped() {
    let h = harness(None);
    let mut events = h.registry.register("s1");

    let mut outcomes = Vec::new();
    for _ in 0..6 {
        let job = VerificationJob::new(
            "s1",
            "The Eiffel Tower is in Paris",
            Vec::new(),
            JobKind::Claim,
        );
        outcomes.push(h.orchestrator.submit(job).await);
    }
    assert_eq!(outcomes[5], DispatchOutcome::Rejected);
    assert!(outcomes[..5].iter().all(|o| *o != DispatchOutcome::Rejected));

    for _ in 0..5 {
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::ClaimResult { .. }
        ));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(h.orchestrator.stats().rejected, 1);
}

#[tokio::test]
async fn test_claimless_transcript_still_answers() {
    let h = harness(None);
    let mut events = h.registry.register("s1");

    let outcome = h
        .orchestrator
        .submit(transcript_job("s1", "Hello there, how are you?"))
        .await;
    assert_eq!(outcome, DispatchOutcome::Delivered);
    match next_event(&mut events).await {
        SessionEvent::ClaimsVerified { claims, .. } => assert!(claims.is_empty()),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(h.source.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_results_only_reach_their_session() {
    let h = harness(None);
    let mut first = h.registry.register("s1");
    let mut second = h.registry.register("s2");

    h.orchestrator
        .submit(transcript_job("s2", "The Eiffel Tower is in Paris."))
        .await;
    assert_eiffel_verified(&next_event(&mut second).await);
    assert!(first.try_recv().is_err());
}
