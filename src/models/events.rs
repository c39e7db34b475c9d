//! Messages exchanged with live sessions.
//!
//! All messages are JSON objects tagged with a kebab-case `type` field.

use super::{EvidenceItem, Verdict, VerificationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inbound message from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// A transcript fragment.
    Transcript {
        /// Transcribed text.
        text: String,
        /// Whether the transcription engine finalized this fragment.
        #[serde(rename = "isFinal", default)]
        is_final: bool,
    },
    /// An on-demand single-claim check.
    VerifyClaim {
        /// The claim text.
        text: String,
    },
}

/// Low-latency preview of an extracted claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimPreview {
    /// The claim text.
    pub claim: String,
    /// Always `unverified` for previews.
    pub verdict: Verdict,
    /// Extraction score (0-100).
    pub confidence: u8,
    /// Detected entities.
    pub entities: Vec<String>,
}

/// Outbound message to one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionEvent {
    /// Results for a final transcript. Always emitted, even with zero claims.
    ClaimsVerified {
        /// The transcript that was processed.
        transcript: String,
        /// One result per verified claim.
        claims: Vec<VerificationResult>,
        /// When processing finished.
        timestamp: DateTime<Utc>,
    },
    /// Extraction preview for an interim transcript.
    ClaimProcessing {
        /// Candidate claims found so far.
        claims: Vec<ClaimPreview>,
    },
    /// Answer to a `verify-claim` request.
    ClaimResult {
        /// The claim text.
        claim: String,
        /// The verdict.
        verdict: Verdict,
        /// Confidence (0-100).
        confidence: u8,
        /// Evidence used.
        sources: Vec<EvidenceItem>,
        /// Human-readable explanation.
        explanation: String,
    },
    /// Terminal failure of a job after retries were exhausted.
    VerificationError {
        /// The transcript or claim text of the failed job.
        text: String,
        /// Failure description.
        message: String,
        /// Attempts made before giving up.
        attempts: u32,
    },
    /// Aggregate update relayed from the broadcast bus.
    StatsUpdate {
        /// Current aggregate snapshot.
        stats: AggregateStats,
    },
}

impl SessionEvent {
    /// Returns the wire name of the event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ClaimsVerified { .. } => "claims-verified",
            Self::ClaimProcessing { .. } => "claim-processing",
            Self::ClaimResult { .. } => "claim-result",
            Self::VerificationError { .. } => "verification-error",
            Self::StatsUpdate { .. } => "stats-update",
        }
    }

    /// Builds a `claim-result` event from a verification result.
    #[must_use]
    pub fn claim_result(result: VerificationResult) -> Self {
        Self::ClaimResult {
            claim: result.claim,
            verdict: result.verdict,
            confidence: result.confidence,
            sources: result.evidence,
            explanation: result.explanation,
        }
    }
}

/// Aggregate counters shared with every session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    /// Total claims verified by this process.
    pub claims_verified: u64,
    /// Per-verdict totals.
    pub verdicts: BTreeMap<String, u64>,
    /// Cache hit rate (0.0-1.0).
    pub cache_hit_rate: f64,
    /// Currently connected sessions.
    pub active_sessions: usize,
}

/// Events published on the process-wide broadcast bus.
#[derive(Debug, Clone)]
pub enum BroadcastEvent {
    /// Aggregate statistics changed.
    StatsUpdated(AggregateStats),
    /// The broker connection changed state.
    BrokerStateChanged {
        /// Whether the broker is now reachable.
        up: bool,
    },
}

impl BroadcastEvent {
    /// Returns a short name for the event type.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::StatsUpdated(_) => "stats_updated",
            Self::BrokerStateChanged { .. } => "broker_state_changed",
        }
    }
}
