//! Candidate claims and their canonical forms.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification tag attached to a candidate claim.
///
/// The tag names the strongest heuristic that fired during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimTag {
    /// Contains a year or a quantity.
    Statistical,
    /// Asserts ownership, founding, or creation.
    Ownership,
    /// Political or geographic assertion.
    Geopolitical,
    /// Defines or classifies something.
    Definitional,
    /// Generic factual statement.
    Factual,
}

impl ClaimTag {
    /// Returns the tag as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::Ownership => "ownership",
            Self::Geopolitical => "geopolitical",
            Self::Definitional => "definitional",
            Self::Factual => "factual",
        }
    }
}

impl fmt::Display for ClaimTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A contiguous span of a transcript that looks like a verifiable assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateClaim {
    /// The raw span text.
    pub text: String,
    /// How verifiable the span looks (0-100).
    pub score: u8,
    /// Detected entity strings, in order of appearance.
    pub entities: Vec<String>,
    /// Strongest heuristic that fired.
    pub tag: ClaimTag,
}

/// Temporal frame of an assertion, inferred from tense markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeContext {
    /// Refers to the past ("was", "founded", "in 1889").
    Past,
    /// Refers to the present ("is", "currently").
    Present,
    /// Refers to the future ("will", "next year").
    Future,
    /// No tense marker (laws of nature, definitions).
    #[default]
    Timeless,
}

impl TimeContext {
    /// Returns the time context as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Past => "past",
            Self::Present => "present",
            Self::Future => "future",
            Self::Timeless => "timeless",
        }
    }
}

impl fmt::Display for TimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized `(subject, relation, object, time)` decomposition of a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalForm {
    /// Who or what the claim is about.
    pub subject: String,
    /// How subject and object relate.
    pub relation: String,
    /// What the subject is related to.
    pub object: String,
    /// Inferred temporal frame.
    pub time_context: TimeContext,
}

impl CanonicalForm {
    /// Builds a retrieval query from the tuple, skipping empty parts.
    #[must_use]
    pub fn query(&self) -> String {
        [&self.subject, &self.relation, &self.object]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.subject, self.relation, self.object, self.time_context
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_skips_empty_parts() {
        let form = CanonicalForm {
            subject: "paris".to_string(),
            relation: String::new(),
            object: "france".to_string(),
            time_context: TimeContext::Present,
        };
        assert_eq!(form.query(), "paris france");
    }

    #[test]
    fn test_time_context_serializes_snake_case() {
        let json = serde_json::to_string(&TimeContext::Timeless).unwrap_or_default();
        assert_eq!(json, "\"timeless\"");
    }
}
