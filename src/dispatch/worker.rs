//! Worker pool consuming the durable queue.

use super::{ConnectionState, JobQueue, JobRunner, run_guarded};
use crate::config::DispatchConfig;
use crate::delivery::DeliveryChannel;
use crate::models::{BroadcastEvent, SessionEvent, VerificationJob};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};

/// Consumes jobs from the durable queue with bounded concurrency.
///
/// A failed job is requeued as its next attempt after an exponential backoff;
/// once `max_attempts` is reached the session receives a
/// `verification-error` instead. While the broker is down the pool only
/// probes it every `reconnect_interval_secs`.
#[derive(Clone)]
pub struct WorkerPool {
    queue: Arc<dyn JobQueue>,
    runner: Arc<dyn JobRunner>,
    delivery: Arc<dyn DeliveryChannel>,
    connection: Arc<ConnectionState>,
    config: DispatchConfig,
}

impl WorkerPool {
    /// Creates a worker pool.
    #[must_use]
    pub fn new(
        queue: Arc<dyn JobQueue>,
        runner: Arc<dyn JobRunner>,
        delivery: Arc<dyn DeliveryChannel>,
        connection: Arc<ConnectionState>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            queue,
            runner,
            delivery,
            connection,
            config,
        }
    }

    /// Runs until `shutdown` turns `true`, then waits for in-flight jobs.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let concurrency = self.config.worker_concurrency.max(1);
        let permits = Arc::new(Semaphore::new(concurrency));
        let reconnect_interval = Duration::from_secs(self.config.reconnect_interval_secs.max(1));
        let pop_timeout = Duration::from_secs(self.config.pop_timeout_secs.max(1));
        tracing::info!(concurrency, queue = self.queue.name(), "Worker pool started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if !self.connection.is_up() {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    },
                    () = tokio::time::sleep(reconnect_interval) => {},
                }
                self.probe().await;
                continue;
            }

            let permit = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                },
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.queue.pop(pop_timeout).await {
                Ok(Some(job)) => {
                    let worker = self.clone();
                    tokio::spawn(async move { worker.process(job, permit).await });
                },
                Ok(None) => drop(permit),
                Err(e) => {
                    drop(permit);
                    self.mark_down(&e.to_string());
                },
            }
        }

        tracing::info!("Worker pool draining");
        let total = u32::try_from(concurrency).unwrap_or(u32::MAX);
        let _ = permits.acquire_many(total).await;
        tracing::info!("Worker pool stopped");
    }

    #[tracing::instrument(skip(self, job, permit), fields(job_id = %job.id, attempt = job.attempt))]
    async fn process(&self, job: VerificationJob, permit: OwnedSemaphorePermit) {
        metrics::gauge!("worker_jobs_in_flight").increment(1.0);
        let result = run_guarded(Arc::clone(&self.runner), job.clone()).await;
        metrics::gauge!("worker_jobs_in_flight").decrement(1.0);

        match result {
            Ok(event) => {
                self.delivery.deliver(&job.session_id, event);
                metrics::counter!("jobs_completed_total").increment(1);
                self.ack(&job).await;
            },
            Err(e) if job.attempt < self.config.max_attempts => {
                drop(permit);
                let delay = self.config.backoff_for(job.attempt);
                tracing::warn!(error = %e, delay_ms = delay.as_millis(), "Job failed, retrying");
                metrics::counter!("jobs_retried_total").increment(1);
                tokio::time::sleep(delay).await;

                let retry = job.next_attempt();
                if let Err(push_err) = self.queue.push(&retry).await {
                    self.mark_down(&push_err.to_string());
                    self.fail(&job, &format!("{e}; retry could not be queued: {push_err}"));
                }
                self.ack(&job).await;
            },
            Err(e) => {
                self.fail(&job, &e.to_string());
                self.ack(&job).await;
            },
        }
    }

    fn fail(&self, job: &VerificationJob, message: &str) {
        metrics::counter!("jobs_failed_total", "mode" => "queued").increment(1);
        tracing::error!(job_id = %job.id, attempts = job.attempt, message, "Job failed terminally");
        self.delivery.deliver(
            &job.session_id,
            SessionEvent::VerificationError {
                text: job.claim_text.clone(),
                message: message.to_string(),
                attempts: job.attempt,
            },
        );
    }

    async fn ack(&self, job: &VerificationJob) {
        if let Err(e) = self.queue.ack(job).await {
            tracing::warn!(job_id = %job.id, error = %e, "Failed to acknowledge job");
            self.mark_down(&e.to_string());
        }
    }

    async fn probe(&self) {
        match self.queue.ping().await {
            Ok(()) => {
                if self.connection.mark_up() {
                    self.delivery
                        .broadcast(BroadcastEvent::BrokerStateChanged { up: true });
                }
            },
            Err(e) => tracing::debug!(error = %e, "Broker still unreachable"),
        }
    }

    fn mark_down(&self, reason: &str) {
        if self.connection.mark_down(reason) {
            self.delivery
                .broadcast(BroadcastEvent::BrokerStateChanged { up: false });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{MemoryQueue, RecordingDelivery, ScriptedRunner};
    use crate::models::JobKind;

    fn config() -> DispatchConfig {
        DispatchConfig {
            max_attempts: 3,
            backoff_base_ms: 1,
            reconnect_interval_secs: 1,
            pop_timeout_secs: 1,
            ..DispatchConfig::default()
        }
    }

    struct Harness {
        queue: Arc<MemoryQueue>,
        delivery: Arc<RecordingDelivery>,
        connection: Arc<ConnectionState>,
        shutdown: watch::Sender<bool>,
        handle: tokio::task::JoinHandle<()>,
    }

    fn start(runner: Arc<ScriptedRunner>, queue: Arc<MemoryQueue>, up: bool) -> Harness {
        let delivery = Arc::new(RecordingDelivery::default());
        let connection = Arc::new(ConnectionState::new());
        if up {
            connection.mark_up();
        }
        let pool = WorkerPool::new(
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            runner,
            Arc::clone(&delivery) as Arc<dyn DeliveryChannel>,
            Arc::clone(&connection),
            config(),
        );
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(pool.run(rx));
        Harness {
            queue,
            delivery,
            connection,
            shutdown,
            handle,
        }
    }

    impl Harness {
        async fn stop(self) {
            let _ = self.shutdown.send(true);
            let _ = self.handle.await;
        }
    }

    fn job() -> VerificationJob {
        VerificationJob::new("s1", "Paris is the capital of France.", vec![], JobKind::Transcript)
    }

    #[tokio::test]
    async fn test_success_delivers_and_acks() {
        let queue = Arc::new(MemoryQueue::with_jobs(vec![job()]));
        let harness = start(Arc::new(ScriptedRunner::succeeding()), queue, true);

        let events = harness.delivery.wait_for(1).await;
        assert!(matches!(events[0].1, SessionEvent::ClaimsVerified { .. }));
        harness.stop_after_idle().await;
    }

    #[tokio::test]
    async fn test_retries_with_backoff_then_succeeds() {
        let runner = Arc::new(ScriptedRunner::failing(2));
        let queue = Arc::new(MemoryQueue::with_jobs(vec![job()]));
        let harness = start(Arc::clone(&runner), queue, true);

        let events = harness.delivery.wait_for(1).await;
        assert!(matches!(events[0].1, SessionEvent::ClaimsVerified { .. }));
        assert_eq!(runner.runs(), 3);
        assert_eq!(harness.queue.max_attempt_seen(), 3);
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_emit_error() {
        let runner = Arc::new(ScriptedRunner::failing(u32::MAX));
        let queue = Arc::new(MemoryQueue::with_jobs(vec![job()]));
        let harness = start(Arc::clone(&runner), queue, true);

        let events = harness.delivery.wait_for(1).await;
        assert!(matches!(
            events[0].1,
            SessionEvent::VerificationError { attempts: 3, .. }
        ));
        assert_eq!(runner.runs(), 3);
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_reconnect_probe_marks_broker_up() {
        let queue = Arc::new(MemoryQueue::with_jobs(vec![job()]));
        let harness = start(Arc::new(ScriptedRunner::succeeding()), queue, false);

        let events = harness.delivery.wait_for(1).await;
        assert_eq!(events.len(), 1);
        assert!(harness.connection.is_up());
        assert!(harness.delivery.broadcasts().contains(&true));
        harness.stop().await;
    }

    #[tokio::test]
    async fn test_pop_failure_marks_broker_down() {
        let queue = Arc::new(MemoryQueue::default());
        queue.set_available(false);
        let harness = start(Arc::new(ScriptedRunner::succeeding()), queue, true);

        for _ in 0..50 {
            if !harness.connection.is_up() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!harness.connection.is_up());
        harness.stop().await;
    }

    impl Harness {
        async fn stop_after_idle(self) {
            for _ in 0..50 {
                if self.queue.processing_len() == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            assert_eq!(self.queue.processing_len(), 0);
            assert_eq!(self.queue.pending_len(), 0);
            self.stop().await;
        }
    }
}
