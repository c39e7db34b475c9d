//! Web search evidence source (Brave Search API).

use super::{EvidenceSource, strip_html};
use crate::config::SearchConfig;
use crate::llm::{LlmHttpConfig, build_http_client, check_status, request_error};
use crate::models::EvidenceItem;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Web search client returning ranked result snippets.
pub struct WebSearchClient {
    api_key: SecretString,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl WebSearchClient {
    /// Provider name.
    pub const NAME: &'static str = "web_search";

    /// Creates a client for the given endpoint.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: SecretString, timeout_ms: u64) -> Self {
        Self {
            api_key,
            endpoint: endpoint.into(),
            client: build_http_client(LlmHttpConfig::with_timeout_ms(timeout_ms)),
        }
    }

    /// Creates a client from configuration; `None` without an API key.
    #[must_use]
    pub fn from_config(config: &SearchConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self::new(&config.base_url, api_key, config.timeout_ms))
    }

    /// Parses a search response body into ranked evidence.
    fn parse_response(body: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        let response: SearchResponse =
            serde_json::from_str(body).map_err(|e| Error::OperationFailed {
                operation: "web_search_response".to_string(),
                cause: e.to_string(),
            })?;

        Ok(response
            .web
            .map(|web| web.results)
            .unwrap_or_default()
            .into_iter()
            .filter(|result| !result.description.trim().is_empty())
            .take(limit)
            .zip(1_u32..)
            .map(|(result, rank)| {
                EvidenceItem::new(
                    Self::NAME,
                    strip_html(&result.title),
                    result.url,
                    strip_html(&result.description),
                )
                .with_rank(rank)
            })
            .collect())
    }
}

impl EvidenceSource for WebSearchClient {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self), fields(provider = "web_search"))]
    fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        let count = limit.clamp(1, 20).to_string();
        let response = self
            .client
            .get(&self.endpoint)
            .header("Accept", "application/json")
            .header("X-Subscription-Token", self.api_key.expose_secret())
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .map_err(|e| request_error(Self::NAME, &e))?;

        let body = check_status(Self::NAME, response)?
            .text()
            .map_err(|e| request_error(Self::NAME, &e))?;
        let items = Self::parse_response(&body, limit)?;
        tracing::debug!(results = items.len(), "Web search completed");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
struct WebResults {
    #[serde(default)]
    results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
struct WebResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
}
