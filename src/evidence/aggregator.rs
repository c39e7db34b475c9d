//! Evidence aggregation into a single verdict.
//!
//! Priority order:
//!
//! 1. The reasoning service, when configured and it returns a definite verdict
//! 2. The fact override table
//! 3. TF-IDF similarity, entailment classification, and the decision table
//!
//! Any failure, timeout, or cooldown in step 1 falls through to the next step.

use super::decision::{Decision, ScoredEvidence, Thresholds, decide};
use super::overrides::FactOverrideTable;
use super::similarity::{classify, similarities};
use crate::Result;
use crate::config::ClaimcheckConfig;
use crate::models::{EvidenceItem, Verdict, VerificationResult};
use crate::providers::{
    Assessment, GuardConfig, GuardedReasoner, ReasoningRequest, ReasoningService,
};
use std::sync::Arc;
use std::time::Duration;

/// Which step produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationStage {
    /// The reasoning service.
    Reasoning,
    /// A fact override rule.
    Override,
    /// The similarity decision table.
    Similarity,
}

impl AggregationStage {
    /// Returns the stage as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Override => "override",
            Self::Similarity => "similarity",
        }
    }
}

/// Combines reasoning, overrides, and retrieved evidence into a verdict.
#[derive(Clone)]
pub struct EvidenceAggregator {
    reasoner: Option<Arc<dyn ReasoningService>>,
    reasoning_timeout: Duration,
    overrides: Arc<FactOverrideTable>,
    thresholds: Thresholds,
    max_evidence: usize,
}

impl Default for EvidenceAggregator {
    fn default() -> Self {
        Self::new(FactOverrideTable::empty(), Thresholds::default(), 5)
    }
}

impl EvidenceAggregator {
    /// Creates an aggregator without a reasoning service.
    #[must_use]
    pub fn new(overrides: FactOverrideTable, thresholds: Thresholds, max_evidence: usize) -> Self {
        Self {
            reasoner: None,
            reasoning_timeout: Duration::from_secs(15),
            overrides: Arc::new(overrides),
            thresholds,
            max_evidence: max_evidence.max(1),
        }
    }

    /// Builds the aggregator described by configuration.
    ///
    /// Loads the fact override table when enabled and wires the guarded
    /// reasoning service when enabled and an API key is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured override table cannot be loaded.
    pub fn from_config(config: &ClaimcheckConfig) -> Result<Self> {
        let overrides = if config.features.fact_overrides {
            FactOverrideTable::load_or_builtin(config.aggregator.overrides_path.as_deref())?
        } else {
            FactOverrideTable::empty()
        };
        let thresholds = Thresholds {
            entailment: config.aggregator.entailment_threshold,
            misleading_floor: config.aggregator.misleading_floor,
        };
        let mut aggregator = Self::new(overrides, thresholds, config.aggregator.max_evidence);

        if config.features.reasoning {
            match crate::llm::build_provider(&config.providers.llm) {
                Some(provider) => {
                    let reasoner = GuardedReasoner::new(
                        crate::llm::LlmReasoner::new(provider),
                        GuardConfig::from(&config.providers.resilience),
                    );
                    aggregator = aggregator.with_reasoner(
                        Arc::new(reasoner),
                        Duration::from_millis(config.providers.llm.timeout_ms),
                    );
                },
                None => tracing::info!("Reasoning service disabled: no API key configured"),
            }
        }
        Ok(aggregator)
    }

    /// Sets the reasoning service and its per-call budget.
    #[must_use]
    pub fn with_reasoner(mut self, reasoner: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        self.reasoner = Some(reasoner);
        self.reasoning_timeout = timeout;
        self
    }

    /// Whether a reasoning service is configured.
    #[must_use]
    pub fn has_reasoner(&self) -> bool {
        self.reasoner.is_some()
    }

    /// The fact override table.
    #[must_use]
    pub fn overrides(&self) -> &FactOverrideTable {
        &self.overrides
    }

    /// Produces a verification result for a claim.
    #[tracing::instrument(skip(self, evidence, prior_context), fields(evidence = evidence.len()))]
    pub async fn aggregate(
        &self,
        claim: &str,
        evidence: Vec<EvidenceItem>,
        prior_context: &[String],
    ) -> VerificationResult {
        let scored = self.score(claim, evidence);

        if let Some(assessment) = self.consult_reasoner(claim, &scored, prior_context).await {
            let used = scored.into_iter().map(|s| s.item).collect();
            return Self::finish(
                claim,
                AggregationStage::Reasoning,
                assessment.verdict,
                assessment.confidence,
                assessment.explanation,
                used,
            );
        }

        self.aggregate_scored(claim, scored)
    }

    /// Runs the deterministic steps only: overrides, then the decision table.
    #[must_use]
    pub fn aggregate_offline(&self, claim: &str, evidence: Vec<EvidenceItem>) -> VerificationResult {
        let scored = self.score(claim, evidence);
        self.aggregate_scored(claim, scored)
    }

    /// Scores evidence against the claim and keeps the most similar items.
    ///
    /// Sorting is stable, so equally similar items keep retrieval order.
    #[must_use]
    pub fn score(&self, claim: &str, evidence: Vec<EvidenceItem>) -> Vec<ScoredEvidence> {
        let texts: Vec<String> = evidence.iter().map(EvidenceItem::scoring_text).collect();
        let scores = similarities(claim, &texts);

        let mut scored: Vec<ScoredEvidence> = evidence
            .into_iter()
            .zip(texts.iter().zip(scores))
            .map(|(item, (text, similarity))| ScoredEvidence {
                relation: classify(claim, text, similarity, self.thresholds.entailment),
                item,
                similarity,
            })
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(self.max_evidence);
        scored
    }

    fn aggregate_scored(&self, claim: &str, scored: Vec<ScoredEvidence>) -> VerificationResult {
        if let Some(rule) = self.overrides.lookup(claim) {
            tracing::debug!(rule = %rule.id, "Fact override matched");
            let used = rule
                .sources
                .iter()
                .cloned()
                .chain(scored.into_iter().map(|s| s.item))
                .take(self.max_evidence)
                .collect();
            return Self::finish(
                claim,
                AggregationStage::Override,
                rule.verdict,
                rule.confidence,
                rule.explanation.clone(),
                used,
            );
        }

        let Decision {
            verdict,
            confidence,
            explanation,
        } = decide(claim, &scored, self.thresholds);
        let used = scored.into_iter().map(|s| s.item).collect();
        Self::finish(
            claim,
            AggregationStage::Similarity,
            verdict,
            confidence,
            explanation,
            used,
        )
    }

    /// Asks the reasoning service; `None` unless it returns a definite verdict
    /// within its budget.
    async fn consult_reasoner(
        &self,
        claim: &str,
        scored: &[ScoredEvidence],
        prior_context: &[String],
    ) -> Option<Assessment> {
        let reasoner = Arc::clone(self.reasoner.as_ref()?);
        let name = reasoner.name();
        let request = ReasoningRequest {
            claim: claim.to_string(),
            evidence: scored.iter().map(|s| s.item.clone()).collect(),
            prior_context: prior_context.to_vec(),
        };

        let call = tokio::task::spawn_blocking(move || reasoner.assess(&request));
        match tokio::time::timeout(self.reasoning_timeout, call).await {
            Ok(Ok(Ok(assessment))) if assessment.verdict != Verdict::Unverified => Some(assessment),
            Ok(Ok(Ok(_))) => {
                tracing::debug!(provider = name, "Reasoning service returned unverified");
                None
            },
            Ok(Ok(Err(err))) => {
                tracing::warn!(provider = name, error = %err, "Reasoning service failed, falling back");
                None
            },
            Ok(Err(join_err)) => {
                tracing::warn!(provider = name, error = %join_err, "Reasoning task failed, falling back");
                None
            },
            Err(_) => {
                metrics::counter!("provider_timeouts_total", "provider" => name).increment(1);
                tracing::warn!(
                    provider = name,
                    timeout_ms = u64::try_from(self.reasoning_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Reasoning service timed out, falling back"
                );
                None
            },
        }
    }

    fn finish(
        claim: &str,
        stage: AggregationStage,
        verdict: Verdict,
        confidence: u8,
        explanation: String,
        evidence: Vec<EvidenceItem>,
    ) -> VerificationResult {
        metrics::counter!(
            "verdicts_total",
            "verdict" => verdict.as_str(),
            "stage" => stage.as_str()
        )
        .increment(1);
        tracing::debug!(
            stage = stage.as_str(),
            verdict = %verdict,
            confidence,
            evidence = evidence.len(),
            "Claim aggregated"
        );
        VerificationResult::new(claim, verdict, confidence, explanation, evidence)
    }
}
