//! Verdict decision table over classified evidence.
//!
//! Pure: the verdict and confidence depend only on the claim text and the
//! supplied similarities and relations.

use super::similarity::Relation;
use crate::extraction::OWNERSHIP_RED_FLAG;
use crate::models::{EvidenceItem, Verdict};

/// Confidence floor for a contradiction-based `false`.
const CONTRADICTION_FLOOR: f64 = 50.0;

/// Confidence of a `false` issued for an unverifiable first-person assertion.
const RED_FLAG_FLOOR: f64 = 60.0;

/// Confidence added per dominant relationship.
const RELATION_BOOST: f64 = 10.0;

/// An evidence item with its similarity to the claim and its relation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEvidence {
    /// The evidence item.
    pub item: EvidenceItem,
    /// TF-IDF cosine similarity to the claim, in `[0, 1]`.
    pub similarity: f64,
    /// Classified relationship to the claim.
    pub relation: Relation,
}

/// Thresholds of the decision table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Mean similarity required for `true`.
    pub entailment: f64,
    /// Lower bound of the `misleading` band.
    pub misleading_floor: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entailment: 0.6,
            misleading_floor: 0.3,
        }
    }
}

/// Outcome of the decision table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// The verdict.
    pub verdict: Verdict,
    /// Confidence (0-100).
    pub confidence: u8,
    /// Human-readable explanation.
    pub explanation: String,
}

/// Relationship counts and mean similarity of an evidence set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvidenceSummary {
    /// Items classified as entailment.
    pub entailments: usize,
    /// Items classified as contradiction.
    pub contradictions: usize,
    /// Items classified as neutral.
    pub neutrals: usize,
    /// Mean similarity across all items; 0 when empty.
    pub mean_similarity: f64,
}

impl EvidenceSummary {
    /// Summarizes scored evidence.
    #[must_use]
    pub fn of(scored: &[ScoredEvidence]) -> Self {
        let mut summary = Self::default();
        for item in scored {
            match item.relation {
                Relation::Entailment => summary.entailments += 1,
                Relation::Contradiction => summary.contradictions += 1,
                Relation::Neutral => summary.neutrals += 1,
            }
        }
        if !scored.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let count = scored.len() as f64;
            summary.mean_similarity = scored.iter().map(|s| s.similarity).sum::<f64>() / count;
        }
        summary
    }
}

/// Applies the decision table.
///
/// | Condition | Verdict |
/// |-----------|---------|
/// | no evidence | `unverified` |
/// | contradictions > entailments | `false` |
/// | entailments > contradictions, mean ≥ entailment threshold | `true` |
/// | entailments = contradictions > 0 | `misleading` |
/// | entailments > 0, mean in `[misleading floor, entailment threshold)` | `misleading` |
/// | otherwise | `unverified` |
///
/// An `unverified` outcome becomes `false` when the claim is a first-person
/// ownership or authority assertion.
///
/// Confidence is `max(mean * 100, floor) + 10 * dominant count`, capped at
/// 100, so it grows monotonically with mean similarity.
#[must_use]
pub fn decide(claim: &str, scored: &[ScoredEvidence], thresholds: Thresholds) -> Decision {
    let summary = EvidenceSummary::of(scored);
    let mean = summary.mean_similarity;
    let (e, c) = (summary.entailments, summary.contradictions);

    let decision = if scored.is_empty() {
        None
    } else if c > e {
        Some(Decision {
            verdict: Verdict::False,
            confidence: confidence(mean, CONTRADICTION_FLOOR, c),
            explanation: format!(
                "{c} of {} sources contradict the claim (mean similarity {mean:.2}).",
                scored.len()
            ),
        })
    } else if e > c && mean >= thresholds.entailment {
        Some(Decision {
            verdict: Verdict::True,
            confidence: confidence(mean, 0.0, e),
            explanation: format!(
                "{e} of {} sources support the claim (mean similarity {mean:.2}).",
                scored.len()
            ),
        })
    } else if e > 0 && e == c {
        Some(Decision {
            verdict: Verdict::Misleading,
            confidence: confidence(mean, 0.0, 0),
            explanation: format!(
                "Sources conflict: {e} support and {c} contradict the claim."
            ),
        })
    } else if e > 0 && mean >= thresholds.misleading_floor {
        Some(Decision {
            verdict: Verdict::Misleading,
            confidence: confidence(mean, 0.0, e),
            explanation: format!(
                "Sources partially support the claim (mean similarity {mean:.2}); it may omit important context."
            ),
        })
    } else {
        None
    };

    decision.unwrap_or_else(|| unverified(claim, mean, scored.len()))
}

fn unverified(claim: &str, mean: f64, evidence_count: usize) -> Decision {
    if OWNERSHIP_RED_FLAG.is_match(claim) {
        return Decision {
            verdict: Verdict::False,
            confidence: confidence(mean, RED_FLAG_FLOOR, 0),
            explanation: "First-person ownership or authority claims cannot be substantiated and are treated as false.".to_string(),
        };
    }
    let explanation = if evidence_count == 0 {
        "No evidence was found for this claim.".to_string()
    } else {
        format!("Evidence is insufficient to verify the claim (mean similarity {mean:.2}).")
    };
    Decision {
        verdict: Verdict::Unverified,
        confidence: confidence(mean, 0.0, 0),
        explanation,
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn confidence(mean: f64, floor: f64, dominant: usize) -> u8 {
    let boost = RELATION_BOOST * dominant as f64;
    ((mean * 100.0).round().max(floor) + boost).clamp(0.0, 100.0) as u8
}
