//! Verdicts and verification results.

use super::EvidenceItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of verifying a single claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Supported by the evidence.
    True,
    /// Contradicted by the evidence.
    False,
    /// Partially supported; true in letter but not in spirit.
    Misleading,
    /// Not enough evidence either way.
    #[default]
    Unverified,
}

impl Verdict {
    /// Returns the verdict as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Misleading => "misleading",
            Self::Unverified => "unverified",
        }
    }

    /// Parses a verdict string, case-insensitively.
    ///
    /// Accepts a few common synonyms produced by reasoning services.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "true" | "correct" | "accurate" | "supported" => Some(Self::True),
            "false" | "incorrect" | "inaccurate" | "refuted" => Some(Self::False),
            "misleading" | "partially true" | "partly true" | "mixed" => Some(Self::Misleading),
            "unverified" | "unknown" | "unverifiable" | "uncertain" => Some(Self::Unverified),
            _ => None,
        }
    }

    /// Returns all verdicts.
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [Self::True, Self::False, Self::Misleading, Self::Unverified]
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one verification attempt for one claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// The claim text that was verified.
    pub claim: String,
    /// The verdict.
    pub verdict: Verdict,
    /// Confidence in the verdict (0-100).
    pub confidence: u8,
    /// Human-readable explanation.
    pub explanation: String,
    /// Evidence actually used (at most five items).
    pub evidence: Vec<EvidenceItem>,
    /// When the result was produced.
    pub timestamp: DateTime<Utc>,
}

impl VerificationResult {
    /// Creates a result stamped with the current time.
    #[must_use]
    pub fn new(
        claim: impl Into<String>,
        verdict: Verdict,
        confidence: u8,
        explanation: impl Into<String>,
        evidence: Vec<EvidenceItem>,
    ) -> Self {
        Self {
            claim: claim.into(),
            verdict,
            confidence: confidence.min(100),
            explanation: explanation.into(),
            evidence,
            timestamp: Utc::now(),
        }
    }
}
