//! Job dispatch: rate limiting, durable queueing, inline fallback, workers.
//!
//! The [`DispatchOrchestrator`] decides per request whether a job is dropped,
//! answered immediately, pushed to the durable [`JobQueue`], or run inline.
//! Both execution paths deliver through the same
//! [`DeliveryChannel`](crate::delivery::DeliveryChannel).

mod connection;
mod dispatcher;
mod orchestrator;
mod queue;
mod rate_limiter;
mod redis_queue;
mod worker;

pub use connection::{BrokerState, ConnectionState};
pub use dispatcher::{DispatchMode, Dispatcher, InlineDispatcher, QueuedDispatcher};
pub use orchestrator::{DispatchOrchestrator, DispatchOutcome, DispatchStats};
pub use queue::JobQueue;
pub use rate_limiter::RateLimiter;
pub use redis_queue::RedisJobQueue;
pub use worker::WorkerPool;

use crate::models::{SessionEvent, VerificationJob};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Executes verification jobs.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Answers a job without running it, when that is possible.
    ///
    /// Used for transcripts with no claims or whose claims are all cached.
    fn fast_path(&self, _job: &VerificationJob) -> Option<SessionEvent> {
        None
    }

    /// Runs the job to completion.
    async fn run(&self, job: &VerificationJob) -> Result<SessionEvent>;
}

/// Runs a job on its own task so a panic surfaces as an error.
pub(crate) async fn run_guarded(
    runner: Arc<dyn JobRunner>,
    job: VerificationJob,
) -> Result<SessionEvent> {
    match tokio::spawn(async move { runner.run(&job).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(Error::OperationFailed {
            operation: "run_job".to_string(),
            cause: join_err.to_string(),
        }),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{JobQueue, JobRunner};
    use crate::delivery::DeliveryChannel;
    use crate::models::{BroadcastEvent, SessionEvent, VerificationJob};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Fails its first `failures` runs, then answers `claims-verified`.
    pub struct ScriptedRunner {
        failures: u32,
        runs: AtomicU32,
        fast_path: bool,
    }

    impl ScriptedRunner {
        pub fn succeeding() -> Self {
            Self::failing(0)
        }

        pub fn failing(failures: u32) -> Self {
            Self {
                failures,
                runs: AtomicU32::new(0),
                fast_path: false,
            }
        }

        pub fn with_fast_path(mut self) -> Self {
            self.fast_path = true;
            self
        }

        pub fn runs(&self) -> u32 {
            self.runs.load(Ordering::SeqCst)
        }

        fn answer(job: &VerificationJob) -> SessionEvent {
            SessionEvent::ClaimsVerified {
                transcript: job.claim_text.clone(),
                claims: Vec::new(),
                timestamp: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl JobRunner for ScriptedRunner {
        fn fast_path(&self, job: &VerificationJob) -> Option<SessionEvent> {
            self.fast_path.then(|| Self::answer(job))
        }

        async fn run(&self, job: &VerificationJob) -> Result<SessionEvent> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst);
            if run < self.failures {
                return Err(Error::OperationFailed {
                    operation: "scripted_run".to_string(),
                    cause: format!("scripted failure {}", run + 1),
                });
            }
            Ok(Self::answer(job))
        }
    }

    /// Records deliveries and broker state broadcasts.
    #[derive(Default)]
    pub struct RecordingDelivery {
        events: Mutex<Vec<(String, SessionEvent)>>,
        broadcasts: Mutex<Vec<bool>>,
        notify: Notify,
    }

    impl RecordingDelivery {
        pub fn events(&self) -> Vec<(String, SessionEvent)> {
            self.events.lock().unwrap().clone()
        }

        pub fn broadcasts(&self) -> Vec<bool> {
            self.broadcasts.lock().unwrap().clone()
        }

        /// Waits up to five seconds for at least `count` deliveries.
        pub async fn wait_for(&self, count: usize) -> Vec<(String, SessionEvent)> {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
            loop {
                let events = self.events();
                if events.len() >= count || tokio::time::Instant::now() >= deadline {
                    return events;
                }
                let _ = tokio::time::timeout_at(deadline, self.notify.notified()).await;
            }
        }
    }

    impl DeliveryChannel for RecordingDelivery {
        fn deliver(&self, session_id: &str, event: SessionEvent) -> bool {
            self.events
                .lock()
                .unwrap()
                .push((session_id.to_string(), event));
            self.notify.notify_one();
            true
        }

        fn broadcast(&self, event: BroadcastEvent) {
            if let BroadcastEvent::BrokerStateChanged { up } = event {
                self.broadcasts.lock().unwrap().push(up);
            }
        }
    }

    /// In-memory queue whose availability can be toggled.
    pub struct MemoryQueue {
        pending: Mutex<VecDeque<VerificationJob>>,
        processing: Mutex<Vec<VerificationJob>>,
        available: AtomicBool,
        max_attempt: AtomicU32,
    }

    impl Default for MemoryQueue {
        fn default() -> Self {
            Self::with_jobs(Vec::new())
        }
    }

    impl MemoryQueue {
        pub fn with_jobs(jobs: Vec<VerificationJob>) -> Self {
            Self {
                pending: Mutex::new(jobs.into()),
                processing: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                max_attempt: AtomicU32::new(0),
            }
        }

        pub fn set_available(&self, available: bool) {
            self.available.store(available, Ordering::SeqCst);
        }

        pub fn pending_len(&self) -> usize {
            self.pending.lock().unwrap().len()
        }

        pub fn processing_len(&self) -> usize {
            self.processing.lock().unwrap().len()
        }

        pub fn max_attempt_seen(&self) -> u32 {
            self.max_attempt.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<()> {
            if self.available.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(Error::QueueUnavailable("connection refused".to_string()))
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
            match job {
                Some(job) => {
                    self.max_attempt.fetch_max(job.attempt, Ordering::SeqCst);
                    self.processing.lock().unwrap().push(job.clone());
                    Ok(Some(job))
                },
                None => {
                    tokio::time::sleep(timeout.min(Duration::from_millis(10))).await;
                    Ok(None)
                },
            }
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
            let orphaned: Vec<VerificationJob> = self.processing.lock().unwrap().drain(..).collect();
            let count = orphaned.len();
            self.pending.lock().unwrap().extend(orphaned);
            Ok(count)
        }
    }
}
