//! Redis job queue integration tests.
//!
//! Exercises the durable broker against a live server:
//! - push / pop / ack lifecycle
//! - pop timeout on an empty queue
//! - recovery of jobs left in the processing list
//!
//! These tests require a running Redis server. Set the environment variable
//! `CLAIMCHECK_TEST_REDIS_URL` to enable them:
//!
//! ```bash
//! export CLAIMCHECK_TEST_REDIS_URL="redis://localhost:6379"
//! cargo test --features redis --test redis_integration
//! ```

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::print_stderr,
    clippy::doc_markdown
)]
#![cfg(feature = "redis")]

use claimcheck::dispatch::{JobQueue, RedisJobQueue};
use claimcheck::models::{JobKind, VerificationJob};
use std::env;
use std::time::Duration;
use uuid::Uuid;

/// Environment variable for Redis test connection URL.
const REDIS_URL_ENV: &str = "CLAIMCHECK_TEST_REDIS_URL";

/// Macro to skip tests when Redis is not available.
macro_rules! require_redis {
    () => {
        match env::var(REDIS_URL_ENV) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: {} not set. Set this environment variable to run Redis tests.",
                    REDIS_URL_ENV
                );
                return;
            },
        }
    };
}

fn unique_queue(url: &str) -> RedisJobQueue {
    let name = format!("claimcheck_test_{}", Uuid::new_v4().simple());
    RedisJobQueue::new(url, &name).expect("valid redis url")
}

fn job(text: &str) -> VerificationJob {
    VerificationJob::new("s1", text, vec!["earlier".to_string()], JobKind::Transcript)
}

#[tokio::test]
async fn test_push_pop_ack_lifecycle() {
    let url = require_redis!();
    let queue = unique_queue(&url);
    queue.ping().await.unwrap();

    let pushed = job("The Eiffel Tower is in Paris.");
    queue.push(&pushed).await.unwrap();

    let popped = queue
        .pop(Duration::from_secs(2))
        .await
        .unwrap()
        .expect("job should be available");
    assert_eq!(popped, pushed);

    queue.ack(&popped).await.unwrap();
    assert_eq!(queue.recover().await.unwrap(), 0);
}

#[tokio::test]
async fn test_pop_times_out_on_empty_queue() {
    let url = require_redis!();
    let queue = unique_queue(&url);

    let popped = queue.pop(Duration::from_millis(300)).await.unwrap();
    assert!(popped.is_none());
}

#[tokio::test]
async fn test_unacked_job_is_recovered() {
    let url = require_redis!();
    let queue = unique_queue(&url);

    queue.push(&job("first")).await.unwrap();
    let orphan = queue.pop(Duration::from_secs(2)).await.unwrap().unwrap();

    assert_eq!(queue.recover().await.unwrap(), 1);
    let again = queue.pop(Duration::from_secs(2)).await.unwrap().unwrap();
    assert_eq!(again.id, orphan.id);
    queue.ack(&again).await.unwrap();
}

#[tokio::test]
async fn test_jobs_pop_in_push_order() {
    let url = require_redis!();
    let queue = unique_queue(&url);

    let first = job("first");
    let second = job("second");
    queue.push(&first).await.unwrap();
    queue.push(&second).await.unwrap();

    let a = queue.pop(Duration::from_secs(2)).await.unwrap().unwrap();
    let b = queue.pop(Duration::from_secs(2)).await.unwrap().unwrap();
    assert_eq!(a.id, first.id);
    assert_eq!(b.id, second.id);
    queue.ack(&a).await.unwrap();
    queue.ack(&b).await.unwrap();
}
