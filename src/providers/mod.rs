//! External knowledge collaborators.
//!
//! Evidence sources return ranked snippets for a query; the reasoning service
//! returns a verdict for a claim plus evidence. Every collaborator is optional
//! and wrapped in a [`ProviderGuard`] so that failures and throttling degrade
//! to deterministic heuristics instead of failing the pipeline.

mod resilience;
mod web_search;
mod wikipedia;

pub use resilience::{BreakerStatus, GuardConfig, GuardedReasoner, GuardedSource, ProviderGuard};
pub use web_search::WebSearchClient;
pub use wikipedia::WikipediaClient;

use crate::Result;
use crate::models::{EvidenceItem, Verdict};
use std::sync::{Arc, LazyLock};

/// A provider of ranked evidence snippets.
pub trait EvidenceSource: Send + Sync {
    /// The provider name, used in evidence origins and metrics.
    fn name(&self) -> &'static str;

    /// Returns up to `limit` ranked evidence items for the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator fails, times out, or throttles.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>>;
}

/// Input to the reasoning service.
#[derive(Debug, Clone, Default)]
pub struct ReasoningRequest {
    /// The claim to assess.
    pub claim: String,
    /// Evidence gathered for the claim.
    pub evidence: Vec<EvidenceItem>,
    /// Recent transcripts from the same session, oldest first.
    pub prior_context: Vec<String>,
}

/// Structured answer of the reasoning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// The verdict.
    pub verdict: Verdict,
    /// Confidence (0-100).
    pub confidence: u8,
    /// Human-readable explanation.
    pub explanation: String,
}

/// A high-trust service that assesses a claim against evidence.
pub trait ReasoningService: Send + Sync {
    /// The service name.
    fn name(&self) -> &'static str;

    /// Assesses the claim.
    ///
    /// # Errors
    ///
    /// Returns an error if the service fails or its reply cannot be parsed.
    fn assess(&self, request: &ReasoningRequest) -> Result<Assessment>;
}

impl<T: EvidenceSource + ?Sized> EvidenceSource for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        (**self).search(query, limit)
    }
}

impl<T: ReasoningService + ?Sized> ReasoningService for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn assess(&self, request: &ReasoningRequest) -> Result<Assessment> {
        (**self).assess(request)
    }
}

#[allow(clippy::expect_used)]
static HTML_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"<[^>]*>").expect("static regex: html tag"));

/// Removes HTML tags and decodes the common entities found in search snippets.
#[must_use]
pub fn strip_html(text: &str) -> String {
    let without_tags = HTML_TAG.replace_all(text, "");
    without_tags
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
