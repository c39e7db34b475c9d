//! Feature flags for optional pipeline stages.

use serde::Deserialize;

/// Feature flags for controlling optional claimcheck stages.
///
/// A collaborator stage runs only when its flag is set *and* it is configured
/// (for example, an API key is present).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Consult the reasoning service before any heuristic.
    pub reasoning: bool,
    /// Query the web search provider for evidence.
    pub web_search: bool,
    /// Query the encyclopedic reference provider for evidence.
    pub reference_lookup: bool,
    /// Apply the fact override table.
    pub fact_overrides: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureFlags {
    /// Creates feature flags with every optional stage disabled.
    ///
    /// Only the deterministic similarity fallback remains.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            reasoning: false,
            web_search: false,
            reference_lookup: false,
            fact_overrides: false,
        }
    }

    /// Creates feature flags with only offline stages enabled.
    #[must_use]
    pub const fn offline() -> Self {
        Self {
            reasoning: false,
            web_search: false,
            reference_lookup: false,
            fact_overrides: true,
        }
    }

    /// Creates feature flags with every stage enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            reasoning: true,
            web_search: true,
            reference_lookup: true,
            fact_overrides: true,
        }
    }

    /// Whether any stage needs network access.
    #[must_use]
    pub const fn uses_network(&self) -> bool {
        self.reasoning || self.web_search || self.reference_lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert!(FeatureFlags::all().uses_network());
        assert!(!FeatureFlags::offline().uses_network());
        assert!(FeatureFlags::offline().fact_overrides);
        assert!(!FeatureFlags::none().fact_overrides);
    }
}
