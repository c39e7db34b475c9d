//! Evidence items retrieved from collaborators.

use serde::{Deserialize, Serialize};

/// Where an evidence snippet came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceOrigin {
    /// Provider name (e.g. `web_search`, `wikipedia`, `fact_table`).
    pub provider: String,
    /// Locator of the source document, usually a URL.
    pub url: String,
    /// Title of the source document.
    pub title: String,
}

/// A retrieved text snippet plus its origin and optional rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// The snippet text.
    pub snippet: String,
    /// Origin descriptor.
    #[serde(flatten)]
    pub origin: EvidenceOrigin,
    /// 1-based rank assigned by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

impl EvidenceItem {
    /// Creates a new evidence item.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            snippet: snippet.into(),
            origin: EvidenceOrigin {
                provider: provider.into(),
                url: url.into(),
                title: title.into(),
            },
            rank: None,
        }
    }

    /// Sets the rank.
    #[must_use]
    pub const fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    /// Text used for similarity scoring: title followed by snippet.
    #[must_use]
    pub fn scoring_text(&self) -> String {
        if self.origin.title.is_empty() {
            self.snippet.clone()
        } else {
            format!("{} {}", self.origin.title, self.snippet)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_is_flattened() {
        let item = EvidenceItem::new("wikipedia", "Paris", "https://example.org", "Capital")
            .with_rank(1);
        let json = serde_json::to_value(&item).unwrap_or_default();
        assert_eq!(json["provider"], "wikipedia");
        assert_eq!(json["rank"], 1);
    }

    #[test]
    fn test_scoring_text_includes_title() {
        let item = EvidenceItem::new("web_search", "Eiffel Tower", "", "A tower in Paris");
        assert_eq!(item.scoring_text(), "Eiffel Tower A tower in Paris");
    }
}
