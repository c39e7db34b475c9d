//! WebSocket session server.
//!
//! Routes:
//!
//! | Route | Description |
//! |-------|-------------|
//! | `GET /ws` | Live session: transcripts in, verification events out |
//! | `GET /health` | Broker state and dispatch mode |
//! | `GET /stats` | Cache, dispatch and aggregate counters |
//!
//! The server also owns the periodic maintenance tasks (cache cleanup and
//! rate-limiter sweeps) and, when a broker is configured, the worker pool.

mod ws;

use crate::cache::CacheStats;
use crate::config::ClaimcheckConfig;
use crate::delivery::{DeliveryChannel, SessionRegistry};
use crate::dispatch::{
    DispatchOrchestrator, DispatchStats, JobQueue, JobRunner, RateLimiter, RedisJobQueue,
    WorkerPool,
};
use crate::models::AggregateStats;
use crate::observability::EventBus;
use crate::services::VerificationPipeline;
use crate::{Error, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<VerificationPipeline>,
    orchestrator: Arc<DispatchOrchestrator>,
    registry: Arc<SessionRegistry>,
    history_len: usize,
}

impl AppState {
    /// Bundles the components a session needs.
    #[must_use]
    pub const fn new(
        pipeline: Arc<VerificationPipeline>,
        orchestrator: Arc<DispatchOrchestrator>,
        registry: Arc<SessionRegistry>,
        history_len: usize,
    ) -> Self {
        Self {
            pipeline,
            orchestrator,
            registry,
            history_len,
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let connection = state.orchestrator.connection();
    let mode = if connection.is_up() { "queued" } else { "inline" };
    Json(serde_json::json!({
        "status": "ok",
        "broker": connection.state().as_str(),
        "mode": mode,
        "sessions": state.registry.active_sessions(),
    }))
}

/// Body of `GET /stats`.
#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStats,
    dispatch: DispatchStats,
    sessions: AggregateStats,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        cache: state.pipeline.cache().stats(),
        dispatch: state.orchestrator.stats(),
        sessions: state.registry.snapshot(),
    })
}

/// The assembled server: state, router and background tasks.
pub struct SessionServer {
    config: ClaimcheckConfig,
    state: AppState,
    worker: Option<WorkerPool>,
}

impl SessionServer {
    /// Wires the pipeline, registry, limiter, orchestrator and optional
    /// durable queue from configuration.
    ///
    /// A broker URL that cannot be parsed is logged and the server runs
    /// every job inline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline cannot be built.
    pub fn from_config(config: ClaimcheckConfig) -> Result<Self> {
        let pipeline = Arc::new(VerificationPipeline::from_config(&config)?);
        let registry = Arc::new(
            SessionRegistry::new(EventBus::default()).with_cache(Arc::clone(pipeline.cache())),
        );
        let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
        let runner: Arc<dyn JobRunner> = Arc::clone(&pipeline) as Arc<dyn JobRunner>;
        let delivery: Arc<dyn DeliveryChannel> = Arc::clone(&registry) as Arc<dyn DeliveryChannel>;

        let mut orchestrator =
            DispatchOrchestrator::new(limiter, Arc::clone(&runner), Arc::clone(&delivery));
        let mut queue: Option<Arc<dyn JobQueue>> = None;
        if let Some(url) = &config.dispatch.redis_url {
            match RedisJobQueue::new(url, &config.dispatch.queue_name) {
                Ok(redis_queue) => {
                    let redis_queue: Arc<dyn JobQueue> = Arc::new(redis_queue);
                    orchestrator = orchestrator.with_queue(Arc::clone(&redis_queue));
                    queue = Some(redis_queue);
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Durable queue disabled, running jobs inline");
                },
            }
        }

        let worker = queue.map(|queue| {
            WorkerPool::new(
                queue,
                runner,
                delivery,
                orchestrator.connection(),
                config.dispatch.clone(),
            )
        });
        let state = AppState::new(
            pipeline,
            Arc::new(orchestrator),
            registry,
            config.server.history_len,
        );
        Ok(Self {
            config,
            state,
            worker,
        })
    }

    /// Shared route state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Serves until Ctrl-C, then stops background tasks and drains workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound or the server fails.
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let broker = self.state.orchestrator.connect().await;
        tracing::info!(broker = %broker, "Dispatch ready");
        tracing::warn!(
            "Rate limit windows and the result cache are per-process and not shared between instances"
        );

        let mut tasks = Vec::new();
        let cache = Arc::clone(self.state.pipeline.cache());
        tasks.push(spawn_periodic(
            "cache_cleanup",
            Duration::from_secs(self.config.cache.cleanup_interval_secs.max(1)),
            shutdown_rx.clone(),
            move || cache.cleanup(),
        ));
        let limiter = Arc::clone(self.state.orchestrator.limiter());
        tasks.push(spawn_periodic(
            "rate_limit_sweep",
            Duration::from_secs(self.config.rate_limit.sweep_interval_secs.max(1)),
            shutdown_rx.clone(),
            move || limiter.sweep(),
        ));
        if let Some(worker) = self.worker {
            tasks.push(tokio::spawn(worker.run(shutdown_rx.clone())));
        }

        let listener = tokio::net::TcpListener::bind(&self.config.server.bind)
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "bind".to_string(),
                cause: format!("{}: {e}", self.config.server.bind),
            })?;
        tracing::info!(bind = %self.config.server.bind, "Session server listening");

        let served = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = shutdown_tx.send(true);
            })
            .await
            .map_err(|e| Error::OperationFailed {
                operation: "serve".to_string(),
                cause: e.to_string(),
            });

        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Background task ended abnormally");
            }
        }
        tracing::info!("Session server stopped");
        served
    }
}

/// Runs `task` every `period` until shutdown.
fn spawn_periodic<F>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    task: F,
) -> JoinHandle<()>
where
    F: Fn() -> usize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = task();
                    tracing::debug!(task = name, removed, "Maintenance pass");
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::ResultCache;
    use crate::evidence::{EvidenceAggregator, EvidenceRetriever};
    use crate::extraction::ClaimExtractor;

    pub fn offline_state(history_len: usize) -> AppState {
        let pipeline = Arc::new(VerificationPipeline::new(
            ClaimExtractor::default(),
            Arc::new(ResultCache::default()),
            EvidenceRetriever::new(),
            EvidenceAggregator::default(),
        ));
        let registry = Arc::new(SessionRegistry::default());
        let orchestrator = DispatchOrchestrator::new(
            Arc::new(RateLimiter::new(5, Duration::from_secs(60))),
            Arc::clone(&pipeline) as Arc<dyn JobRunner>,
            Arc::clone(&registry) as Arc<dyn DeliveryChannel>,
        );
        AppState::new(pipeline, Arc::new(orchestrator), registry, history_len)
    }

    #[tokio::test]
    async fn test_health_reports_inline_without_broker() {
        let Json(body) = health(State(offline_state(3))).await;
        assert_eq!(body["broker"], "down");
        assert_eq!(body["mode"], "inline");
        assert_eq!(body["sessions"], 0);
    }

    #[tokio::test]
    async fn test_stats_serializes_every_section() {
        let Json(body) = stats(State(offline_state(3))).await;
        let value = serde_json::to_value(&body).unwrap();
        assert!(value["cache"]["max_size"].is_number());
        assert_eq!(value["dispatch"]["received"], 0);
        assert_eq!(value["sessions"]["active_sessions"], 0);
    }

    #[tokio::test]
    async fn test_periodic_task_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let handle = spawn_periodic("noop", Duration::from_secs(3600), rx, || 0);
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_from_config_without_broker() {
        let server = SessionServer::from_config(ClaimcheckConfig::default()).unwrap();
        assert!(server.worker.is_none());
        assert!(server.state().orchestrator.queue().is_none());
    }
}
