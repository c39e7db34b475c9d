//! Durable job queue abstraction.

use crate::Result;
use crate::models::VerificationJob;
use async_trait::async_trait;
use std::time::Duration;

/// A durable broker holding verification jobs.
///
/// Popped jobs stay in flight until acknowledged. `recover` returns jobs that
/// were in flight when a previous worker died back to the pending side.
/// Every method fails with [`Error::QueueUnavailable`](crate::Error::QueueUnavailable)
/// when the broker cannot be reached.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Backend name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Appends a job to the pending side.
    async fn push(&self, job: &VerificationJob) -> Result<()>;

    /// Waits up to `timeout` for the next job and marks it in flight.
    async fn pop(&self, timeout: Duration) -> Result<Option<VerificationJob>>;

    /// Removes a finished job from the in-flight side.
    async fn ack(&self, job: &VerificationJob) -> Result<()>;

    /// Checks that the broker answers.
    async fn ping(&self) -> Result<()>;

    /// Requeues orphaned in-flight jobs. Returns how many were moved.
    async fn recover(&self) -> Result<usize>;
}
