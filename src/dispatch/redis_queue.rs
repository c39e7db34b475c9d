//! Redis-backed durable job queue.
//!
//! Jobs are JSON strings in a pending list. `pop` atomically moves one into a
//! processing list with `LMOVE`, polling until its timeout; `ack` removes it
//! from there. Anything left in the processing list after a crash is moved
//! back by `recover`.

#[cfg(feature = "redis")]
mod implementation {
    use crate::dispatch::JobQueue;
    use crate::models::VerificationJob;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use redis::Client;
    use redis::aio::ConnectionManager;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Redis job queue using a pending and a processing list.
    pub struct RedisJobQueue {
        client: Client,
        pending_key: String,
        processing_key: String,
        connection: Mutex<Option<ConnectionManager>>,
        /// Raw payloads of popped jobs by id and attempt, needed for `LREM`.
        in_flight: std::sync::Mutex<HashMap<(Uuid, u32), String>>,
    }

    impl RedisJobQueue {
        /// Creates a queue. Connections are opened lazily.
        ///
        /// # Errors
        ///
        /// Returns an error if the URL is invalid.
        pub fn new(connection_url: &str, queue_name: &str) -> Result<Self> {
            let client = Client::open(connection_url).map_err(|e| Error::OperationFailed {
                operation: "redis_open".to_string(),
                cause: e.to_string(),
            })?;

            Ok(Self {
                client,
                pending_key: format!("{queue_name}:pending"),
                processing_key: format!("{queue_name}:processing"),
                connection: Mutex::new(None),
                in_flight: std::sync::Mutex::new(HashMap::new()),
            })
        }

        async fn connection(&self) -> Result<ConnectionManager> {
            let mut guard = self.connection.lock().await;
            if let Some(conn) = guard.as_ref() {
                return Ok(conn.clone());
            }
            let conn = ConnectionManager::new(self.client.clone())
                .await
                .map_err(unavailable)?;
            *guard = Some(conn.clone());
            Ok(conn)
        }

        fn in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<(Uuid, u32), String>> {
            self.in_flight
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl JobQueue for RedisJobQueue {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn push(&self, job: &VerificationJob) -> Result<()> {
            let payload = serde_json::to_string(job).map_err(|e| Error::OperationFailed {
                operation: "serialize_job".to_string(),
                cause: e.to_string(),
            })?;
            let mut conn = self.connection().await?;
            let _: i64 = redis::cmd("LPUSH")
                .arg(&self.pending_key)
                .arg(payload)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            Ok(())
        }

        async fn pop(&self, timeout: Duration) -> Result<Option<VerificationJob>> {
            let deadline = tokio::time::Instant::now() + timeout;
            let mut conn = self.connection().await?;
            let payload = loop {
                let payload: Option<String> = redis::cmd("LMOVE")
                    .arg(&self.pending_key)
                    .arg(&self.processing_key)
                    .arg("RIGHT")
                    .arg("LEFT")
                    .query_async(&mut conn)
                    .await
                    .map_err(unavailable)?;
                if payload.is_some() || tokio::time::Instant::now() >= deadline {
                    break payload;
                }
                tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
            };

            let Some(payload) = payload else {
                return Ok(None);
            };
            match serde_json::from_str::<VerificationJob>(&payload) {
                Ok(job) => {
                    self.in_flight().insert((job.id, job.attempt), payload);
                    Ok(Some(job))
                },
                Err(e) => {
                    tracing::error!(error = %e, "Discarding unparseable job payload");
                    let _: i64 = redis::cmd("LREM")
                        .arg(&self.processing_key)
                        .arg(1)
                        .arg(&payload)
                        .query_async(&mut conn)
                        .await
                        .map_err(unavailable)?;
                    Ok(None)
                },
            }
        }

        async fn ack(&self, job: &VerificationJob) -> Result<()> {
            let payload = self.in_flight().remove(&(job.id, job.attempt));
            let Some(payload) = payload else {
                tracing::debug!(job_id = %job.id, "Ack for job not popped by this queue");
                return Ok(());
            };
            let mut conn = self.connection().await?;
            let _: i64 = redis::cmd("LREM")
                .arg(&self.processing_key)
                .arg(1)
                .arg(payload)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            let mut conn = self.connection().await?;
            let _: String = redis::cmd("PING")
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            Ok(())
        }

        async fn recover(&self) -> Result<usize> {
            let mut conn = self.connection().await?;
            let mut moved = 0;
            loop {
                let payload: Option<String> = redis::cmd("LMOVE")
                    .arg(&self.processing_key)
                    .arg(&self.pending_key)
                    .arg("RIGHT")
                    .arg("RIGHT")
                    .query_async(&mut conn)
                    .await
                    .map_err(unavailable)?;
                if payload.is_none() {
                    break;
                }
                moved += 1;
            }
            if moved > 0 {
                tracing::info!(moved, "Requeued orphaned in-flight jobs");
            }
            Ok(moved)
        }
    }

    #[allow(clippy::needless_pass_by_value)]
    fn unavailable(e: redis::RedisError) -> Error {
        Error::QueueUnavailable(e.to_string())
    }
}

#[cfg(not(feature = "redis"))]
mod stub {
    use crate::dispatch::JobQueue;
    use crate::models::VerificationJob;
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Stub Redis job queue when the feature is not enabled.
    pub struct RedisJobQueue;

    impl RedisJobQueue {
        /// Creates a new Redis job queue (stub).
        ///
        /// # Errors
        ///
        /// Always returns an error because the feature is not enabled.
        pub fn new(_connection_url: &str, _queue_name: &str) -> Result<Self> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }
    }

    #[async_trait]
    impl JobQueue for RedisJobQueue {
        fn name(&self) -> &'static str {
            "redis"
        }

        async fn push(&self, _job: &VerificationJob) -> Result<()> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        async fn pop(&self, _timeout: Duration) -> Result<Option<VerificationJob>> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        async fn ack(&self, _job: &VerificationJob) -> Result<()> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        async fn ping(&self) -> Result<()> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }

        async fn recover(&self) -> Result<usize> {
            Err(Error::FeatureNotEnabled("redis".to_string()))
        }
    }
}

#[cfg(feature = "redis")]
pub use implementation::RedisJobQueue;

#[cfg(not(feature = "redis"))]
pub use stub::RedisJobQueue;
