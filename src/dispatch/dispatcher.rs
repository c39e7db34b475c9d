//! Queued and inline job execution behind one interface.

use super::{JobQueue, JobRunner, run_guarded};
use crate::Result;
use crate::delivery::DeliveryChannel;
use crate::models::{SessionEvent, VerificationJob};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// How a job was handed off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Pushed to the durable queue for the worker pool.
    Queued,
    /// Running in this process.
    Inline,
}

impl DispatchMode {
    /// Returns the mode as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Inline => "inline",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hands a job off for execution without waiting for its result.
///
/// The result always reaches the session through the delivery channel.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// The mode this dispatcher implements.
    fn mode(&self) -> DispatchMode;

    /// Hands the job off. An error means the job was not accepted.
    async fn dispatch(&self, job: VerificationJob) -> Result<()>;
}

/// Pushes jobs to a durable queue.
pub struct QueuedDispatcher {
    queue: Arc<dyn JobQueue>,
}

impl QueuedDispatcher {
    /// Creates a dispatcher over a queue.
    #[must_use]
    pub fn new(queue: Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl Dispatcher for QueuedDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Queued
    }

    async fn dispatch(&self, job: VerificationJob) -> Result<()> {
        self.queue.push(&job).await?;
        tracing::debug!(job_id = %job.id, queue = self.queue.name(), "Job queued");
        Ok(())
    }
}

/// Runs jobs on a spawned task in this process, once, without retry.
pub struct InlineDispatcher {
    runner: Arc<dyn JobRunner>,
    delivery: Arc<dyn DeliveryChannel>,
}

impl InlineDispatcher {
    /// Creates an inline dispatcher.
    #[must_use]
    pub fn new(runner: Arc<dyn JobRunner>, delivery: Arc<dyn DeliveryChannel>) -> Self {
        Self { runner, delivery }
    }
}

#[async_trait]
impl Dispatcher for InlineDispatcher {
    fn mode(&self) -> DispatchMode {
        DispatchMode::Inline
    }

    async fn dispatch(&self, job: VerificationJob) -> Result<()> {
        let runner = Arc::clone(&self.runner);
        let delivery = Arc::clone(&self.delivery);
        tokio::spawn(async move {
            let event = match run_guarded(runner, job.clone()).await {
                Ok(event) => event,
                Err(e) => {
                    metrics::counter!("jobs_failed_total", "mode" => "inline").increment(1);
                    tracing::error!(job_id = %job.id, error = %e, "Inline job failed");
                    SessionEvent::VerificationError {
                        text: job.claim_text.clone(),
                        message: e.to_string(),
                        attempts: job.attempt,
                    }
                },
            };
            delivery.deliver(&job.session_id, event);
        });
        Ok(())
    }
}
