//! End-to-end verification pipeline.

use crate::cache::ResultCache;
use crate::config::ClaimcheckConfig;
use crate::dispatch::JobRunner;
use crate::evidence::{EvidenceAggregator, EvidenceRetriever};
use crate::extraction::{Canonicalizer, ClaimExtractor};
use crate::models::{
    CandidateClaim, ClaimPreview, JobKind, SessionEvent, Verdict, VerificationJob,
    VerificationResult,
};
use crate::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::instrument;

const PERSONAL_EXPLANATION: &str = "Personal or subjective statement; not fact-checked.";

/// Composes extraction, caching, retrieval, and aggregation.
///
/// Cheap to clone; clones share the cache.
#[derive(Clone)]
pub struct VerificationPipeline {
    extractor: ClaimExtractor,
    cache: Arc<ResultCache>,
    retriever: EvidenceRetriever,
    aggregator: EvidenceAggregator,
}

impl VerificationPipeline {
    /// Creates a pipeline from its parts.
    #[must_use]
    pub const fn new(
        extractor: ClaimExtractor,
        cache: Arc<ResultCache>,
        retriever: EvidenceRetriever,
        aggregator: EvidenceAggregator,
    ) -> Self {
        Self {
            extractor,
            cache,
            retriever,
            aggregator,
        }
    }

    /// Builds the pipeline described by configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the fact override table cannot be loaded.
    pub fn from_config(config: &ClaimcheckConfig) -> Result<Self> {
        let retriever = if config.features.uses_network() {
            EvidenceRetriever::from_config(&config.providers, &config.features)
        } else {
            EvidenceRetriever::new()
        };
        let pipeline = Self::new(
            ClaimExtractor::new(config.extraction.clone()),
            Arc::new(ResultCache::from_config(&config.cache)),
            retriever,
            EvidenceAggregator::from_config(config)?,
        );
        tracing::info!(
            sources = ?pipeline.retriever.source_names(),
            reasoning = pipeline.aggregator.has_reasoner(),
            overrides = pipeline.aggregator.overrides().len(),
            "Verification pipeline ready"
        );
        Ok(pipeline)
    }

    /// The shared result cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// The claim extractor.
    #[must_use]
    pub const fn extractor(&self) -> &ClaimExtractor {
        &self.extractor
    }

    /// Whether a final transcript is long enough to verify.
    #[must_use]
    pub fn accepts_transcript(&self, transcript: &str) -> bool {
        transcript.trim().chars().count() >= self.extractor.config().min_transcript_chars
    }

    /// Extraction-only preview for interim transcripts.
    #[must_use]
    pub fn preview(&self, transcript: &str) -> Vec<ClaimPreview> {
        self.extractor.preview(transcript)
    }

    /// Extracted claims minus personal and subjective statements.
    #[must_use]
    pub fn verifiable_claims(&self, transcript: &str) -> Vec<CandidateClaim> {
        self.extractor
            .extract(transcript)
            .into_iter()
            .filter(|claim| {
                let personal = Canonicalizer::is_personal(&claim.text);
                if personal {
                    tracing::debug!(claim = %claim.text, "Skipping personal claim");
                }
                !personal
            })
            .collect()
    }

    /// Returns results for a transcript only if every claim is cached.
    ///
    /// A transcript without verifiable claims yields an empty list.
    #[must_use]
    pub fn cached_results(&self, transcript: &str) -> Option<Vec<VerificationResult>> {
        let claims = self.verifiable_claims(transcript);
        if !claims.iter().all(|claim| self.cache.contains(&claim.text)) {
            return None;
        }
        claims
            .iter()
            .map(|claim| self.cache.get(&claim.text).map(|entry| entry.to_result(&claim.text)))
            .collect()
    }

    /// Verifies one claim: cache, then retrieval and aggregation.
    ///
    /// Personal statements are answered `unverified` without any lookup.
    /// Fresh results are stored unless they are `unverified` with no evidence,
    /// which usually means every collaborator was unavailable.
    #[instrument(skip(self, prior_context), fields(claim_length = claim.len()))]
    pub async fn verify_claim(&self, claim: &str, prior_context: &[String]) -> VerificationResult {
        if Canonicalizer::is_personal(claim) {
            return VerificationResult::new(
                claim,
                Verdict::Unverified,
                0,
                PERSONAL_EXPLANATION,
                Vec::new(),
            );
        }
        if let Some(entry) = self.cache.get(claim) {
            tracing::debug!(verdict = %entry.verdict, "Cache hit");
            return entry.to_result(claim);
        }

        let start = Instant::now();
        let canonical = Canonicalizer::canonicalize(claim);
        let query = canonical.query();
        let query = if query.is_empty() { claim } else { query.as_str() };
        tracing::debug!(%canonical, "Canonicalized claim");

        let evidence = self.retriever.retrieve(query).await;
        let result = self.aggregator.aggregate(claim, evidence, prior_context).await;

        if result.verdict != Verdict::Unverified || !result.evidence.is_empty() {
            self.cache.store(&result);
        }
        metrics::histogram!("claim_verification_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        result
    }

    /// Verifies every claim of a transcript concurrently.
    ///
    /// Results keep extraction order. A claim whose task panics is dropped.
    #[instrument(skip(self, transcript, prior_context), fields(transcript_length = transcript.len()))]
    pub async fn verify_transcript(
        &self,
        transcript: &str,
        prior_context: &[String],
    ) -> Vec<VerificationResult> {
        let claims = self.verifiable_claims(transcript);
        let mut tasks = JoinSet::new();
        for (index, claim) in claims.into_iter().enumerate() {
            let pipeline = self.clone();
            let context = prior_context.to_vec();
            tasks.spawn(async move { (index, pipeline.verify_claim(&claim.text, &context).await) });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => tracing::error!(error = %e, "Claim verification task failed"),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// Runs a verification job and builds the event answering it.
    pub async fn run_job(&self, job: &VerificationJob) -> SessionEvent {
        match job.kind {
            JobKind::Transcript => SessionEvent::ClaimsVerified {
                transcript: job.claim_text.clone(),
                claims: self
                    .verify_transcript(&job.claim_text, &job.prior_context)
                    .await,
                timestamp: Utc::now(),
            },
            JobKind::Claim => SessionEvent::claim_result(
                self.verify_claim(&job.claim_text, &job.prior_context)
                    .await,
            ),
        }
    }
}

#[async_trait]
impl JobRunner for VerificationPipeline {
    fn fast_path(&self, job: &VerificationJob) -> Option<SessionEvent> {
        match job.kind {
            JobKind::Transcript => {
                self.cached_results(&job.claim_text)
                    .map(|claims| SessionEvent::ClaimsVerified {
                        transcript: job.claim_text.clone(),
                        claims,
                        timestamp: Utc::now(),
                    })
            },
            JobKind::Claim => {
                let claim = job.claim_text.as_str();
                if Canonicalizer::is_personal(claim) {
                    return Some(SessionEvent::claim_result(VerificationResult::new(
                        claim,
                        Verdict::Unverified,
                        0,
                        PERSONAL_EXPLANATION,
                        Vec::new(),
                    )));
                }
                if !self.cache.contains(claim) {
                    return None;
                }
                self.cache
                    .get(claim)
                    .map(|entry| SessionEvent::claim_result(entry.to_result(claim)))
            },
        }
    }

    async fn run(&self, job: &VerificationJob) -> Result<SessionEvent> {
        Ok(self.run_job(job).await)
    }
}
