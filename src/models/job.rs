//! Verification jobs owned by the dispatch layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a job verifies and which event it answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A final transcript; answered with `claims-verified`.
    Transcript,
    /// A single on-demand claim; answered with `claim-result`.
    Claim,
}

/// A unit of verification work.
///
/// Serialized as JSON when pushed to the durable broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationJob {
    /// Unique job identifier.
    pub id: Uuid,
    /// The session that will receive the result.
    pub session_id: String,
    /// Transcript or claim text, depending on `kind`.
    pub claim_text: String,
    /// Previous final transcripts of the session, oldest first.
    pub prior_context: Vec<String>,
    /// When the job was first enqueued.
    pub enqueued_at: DateTime<Utc>,
    /// 1-based attempt number.
    pub attempt: u32,
    /// What the job verifies.
    pub kind: JobKind,
}

impl VerificationJob {
    /// Creates a first-attempt job.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        claim_text: impl Into<String>,
        prior_context: Vec<String>,
        kind: JobKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session_id.into(),
            claim_text: claim_text.into(),
            prior_context,
            enqueued_at: Utc::now(),
            attempt: 1,
            kind,
        }
    }

    /// Returns a copy scheduled for the next attempt.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_attempt_keeps_identity() {
        let job = VerificationJob::new("s1", "text", vec![], JobKind::Claim);
        let retry = job.next_attempt();
        assert_eq!(retry.id, job.id);
        assert_eq!(retry.attempt, 2);
        assert_eq!(retry.enqueued_at, job.enqueued_at);
    }

    #[test]
    fn test_job_json_roundtrip() {
        let job = VerificationJob::new("s1", "text", vec!["before".into()], JobKind::Transcript);
        let json = serde_json::to_string(&job).unwrap_or_default();
        let parsed: Option<VerificationJob> = serde_json::from_str(&json).ok();
        assert_eq!(parsed, Some(job));
    }
}
