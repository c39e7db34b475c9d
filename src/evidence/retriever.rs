//! Parallel evidence retrieval across collaborators.

use crate::config::{FeatureFlags, ProvidersConfig};
use crate::models::EvidenceItem;
use crate::providers::{
    EvidenceSource, GuardConfig, GuardedSource, WebSearchClient, WikipediaClient,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// One configured source with its own result limit and time budget.
#[derive(Clone)]
struct SourceEntry {
    source: Arc<dyn EvidenceSource>,
    limit: usize,
    timeout: Duration,
}

/// Queries every configured evidence source in parallel.
///
/// Each source runs on the blocking pool under its own timeout. A source that
/// fails, throttles, or times out contributes no evidence; it never fails the
/// retrieval as a whole.
#[derive(Clone, Default)]
pub struct EvidenceRetriever {
    sources: Vec<SourceEntry>,
}

impl EvidenceRetriever {
    /// Creates a retriever with no sources.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a source.
    #[must_use]
    pub fn with_source(
        mut self,
        source: Arc<dyn EvidenceSource>,
        limit: usize,
        timeout: Duration,
    ) -> Self {
        self.sources.push(SourceEntry {
            source,
            limit,
            timeout,
        });
        self
    }

    /// Builds the guarded sources enabled by configuration.
    ///
    /// Web search needs an API key; the reference source does not.
    #[must_use]
    pub fn from_config(config: &ProvidersConfig, features: &FeatureFlags) -> Self {
        let guard_config = GuardConfig::from(&config.resilience);
        let mut retriever = Self::new();

        if features.web_search {
            match WebSearchClient::from_config(&config.search) {
                Some(client) => {
                    retriever = retriever.with_source(
                        Arc::new(GuardedSource::new(client, guard_config)),
                        config.search.max_results,
                        Duration::from_millis(config.search.timeout_ms),
                    );
                },
                None => tracing::info!("Web search disabled: no API key configured"),
            }
        }
        if features.reference_lookup {
            retriever = retriever.with_source(
                Arc::new(GuardedSource::new(
                    WikipediaClient::from_config(&config.reference),
                    guard_config,
                )),
                config.reference.max_results,
                Duration::from_millis(config.reference.timeout_ms),
            );
        }
        retriever
    }

    /// Names of the configured sources.
    #[must_use]
    pub fn source_names(&self) -> Vec<&'static str> {
        self.sources.iter().map(|entry| entry.source.name()).collect()
    }

    /// Whether no source is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Retrieves evidence for a query from all sources.
    ///
    /// Items keep source order, then provider rank. Items with a URL already
    /// seen are dropped.
    #[tracing::instrument(skip(self), fields(sources = self.sources.len()))]
    pub async fn retrieve(&self, query: &str) -> Vec<EvidenceItem> {
        if self.sources.is_empty() || query.trim().is_empty() {
            return Vec::new();
        }

        let mut tasks = JoinSet::new();
        for (index, entry) in self.sources.iter().cloned().enumerate() {
            let query = query.to_string();
            tasks.spawn(async move {
                let name = entry.source.name();
                let source = Arc::clone(&entry.source);
                let limit = entry.limit;
                let call = tokio::task::spawn_blocking(move || source.search(&query, limit));
                let outcome = match tokio::time::timeout(entry.timeout, call).await {
                    Ok(Ok(Ok(items))) => Ok(items),
                    Ok(Ok(Err(err))) => Err(err.to_string()),
                    Ok(Err(join_err)) => Err(format!("task failed: {join_err}")),
                    Err(_) => Err(format!(
                        "timed out after {}ms",
                        entry.timeout.as_millis()
                    )),
                };
                (index, name, outcome)
            });
        }

        let mut per_source: Vec<(usize, Vec<EvidenceItem>)> = Vec::with_capacity(self.sources.len());
        while let Some(joined) = tasks.join_next().await {
            let Ok((index, name, outcome)) = joined else {
                continue;
            };
            match outcome {
                Ok(items) => {
                    tracing::debug!(provider = name, results = items.len(), "Evidence retrieved");
                    per_source.push((index, items));
                },
                Err(reason) => {
                    metrics::counter!("evidence_retrieval_failures_total", "provider" => name)
                        .increment(1);
                    tracing::warn!(provider = name, %reason, "No evidence from source");
                },
            }
        }

        per_source.sort_by_key(|(index, _)| *index);
        let mut seen = HashSet::new();
        per_source
            .into_iter()
            .flat_map(|(_, items)| items)
            .filter(|item| item.origin.url.is_empty() || seen.insert(item.origin.url.clone()))
            .collect()
    }
}
