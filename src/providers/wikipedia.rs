//! Encyclopedic reference evidence source (`MediaWiki` search API).

use super::{EvidenceSource, strip_html};
use crate::config::ReferenceConfig;
use crate::llm::{LlmHttpConfig, build_http_client, check_status, request_error};
use crate::models::EvidenceItem;
use crate::{Error, Result};
use serde::Deserialize;

/// `MediaWiki` full-text search client.
pub struct WikipediaClient {
    api_url: String,
    article_base: String,
    client: reqwest::blocking::Client,
}

impl WikipediaClient {
    /// Provider name.
    pub const NAME: &'static str = "wikipedia";

    /// Creates a client for the given `api.php` endpoint.
    #[must_use]
    pub fn new(api_url: impl Into<String>, timeout_ms: u64) -> Self {
        let api_url = api_url.into();
        let article_base = article_base(&api_url);
        Self {
            api_url,
            article_base,
            client: build_http_client(LlmHttpConfig::with_timeout_ms(timeout_ms)),
        }
    }

    /// Creates a client from configuration.
    #[must_use]
    pub fn from_config(config: &ReferenceConfig) -> Self {
        Self::new(&config.base_url, config.timeout_ms)
    }

    /// Parses a search response body into ranked evidence.
    fn parse_response(&self, body: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        let response: QueryResponse =
            serde_json::from_str(body).map_err(|e| Error::OperationFailed {
                operation: "wikipedia_response".to_string(),
                cause: e.to_string(),
            })?;

        Ok(response
            .query
            .map(|query| query.search)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .zip(1_u32..)
            .map(|(hit, rank)| {
                let url = format!("{}{}", self.article_base, hit.title.replace(' ', "_"));
                EvidenceItem::new(Self::NAME, hit.title, url, strip_html(&hit.snippet))
                    .with_rank(rank)
            })
            .collect())
    }
}

/// Derives the article URL prefix from an `api.php` URL.
fn article_base(api_url: &str) -> String {
    api_url.strip_suffix("/w/api.php").map_or_else(
        || "https://en.wikipedia.org/wiki/".to_string(),
        |host| format!("{host}/wiki/"),
    )
}

impl EvidenceSource for WikipediaClient {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[tracing::instrument(skip(self), fields(provider = "wikipedia"))]
    fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        let srlimit = limit.clamp(1, 10).to_string();
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("format", "json"),
                ("utf8", "1"),
                ("srsearch", query),
                ("srlimit", srlimit.as_str()),
            ])
            .send()
            .map_err(|e| request_error(Self::NAME, &e))?;

        let body = check_status(Self::NAME, response)?
            .text()
            .map_err(|e| request_error(Self::NAME, &e))?;
        let items = self.parse_response(&body, limit)?;
        tracing::debug!(results = items.len(), "Reference lookup completed");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
    #[serde(default)]
    snippet: String,
}
