//! # Claimcheck
//!
//! Real-time claim extraction and evidence-based verification for live
//! spoken-language transcripts.
//!
//! Claimcheck splits transcripts into candidate factual assertions, reduces
//! them to canonical forms, and produces a verdict (true / false / misleading /
//! unverified) with supporting evidence, within a few seconds, for many
//! concurrent sessions.
//!
//! ## Features
//!
//! - Pure, deterministic claim extraction and canonicalization
//! - Bounded, TTL-expiring result cache keyed by normalized claim text
//! - Evidence aggregation: reasoning service, fact overrides, TF-IDF entailment
//! - Durable job dispatch over Redis with transparent in-process fallback
//! - Per-session sliding-window rate limiting
//! - WebSocket delivery channel with aggregate broadcast updates
//!
//! ## Example
//!
//! ```rust,ignore
//! use claimcheck::extraction::ClaimExtractor;
//!
//! let extractor = ClaimExtractor::default();
//! let claims = extractor.extract("The Eiffel Tower is in Paris.");
//! assert_eq!(claims.len(), 1);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cache;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod evidence;
pub mod extraction;
pub mod llm;
pub mod models;
pub mod observability;
pub mod providers;
#[cfg(feature = "http")]
pub mod server;
pub mod services;

// Re-exports for convenience
pub use cache::{CacheStats, ResultCache};
pub use config::ClaimcheckConfig;
pub use dispatch::{DispatchOrchestrator, RateLimiter};
pub use evidence::EvidenceAggregator;
pub use extraction::{Canonicalizer, ClaimExtractor, ClaimKey};
pub use models::{
    CandidateClaim, CanonicalForm, EvidenceItem, SessionEvent, TimeContext, Verdict,
    VerificationJob, VerificationResult,
};
pub use services::VerificationPipeline;

/// Error type for claimcheck operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed config, invalid override patterns, unparseable messages |
/// | `OperationFailed` | I/O errors, HTTP errors, unparseable collaborator replies |
/// | `RateLimited` | A collaborator answered with HTTP 429 |
/// | `Timeout` | A collaborator call exceeded its per-call budget |
/// | `ProviderUnavailable` | A collaborator is cooling down or its breaker is open |
/// | `QueueUnavailable` | The job broker cannot be reached |
/// | `FeatureNotEnabled` | Using features requiring compile-time flags |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A collaborator signalled that it is throttling us.
    #[error("provider '{provider}' is rate limited")]
    RateLimited {
        /// The collaborator name.
        provider: String,
        /// Seconds to wait before retrying, when the collaborator said so.
        retry_after_secs: Option<u64>,
    },

    /// A collaborator call exceeded its time budget.
    #[error("operation '{operation}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The budget that was exceeded.
        timeout_ms: u64,
    },

    /// A collaborator is skipped (cooldown or open circuit breaker).
    #[error("provider '{provider}' unavailable: {reason}")]
    ProviderUnavailable {
        /// The collaborator name.
        provider: String,
        /// Why calls are currently skipped.
        reason: String,
    },

    /// The durable job broker could not be reached.
    #[error("job queue unavailable: {0}")]
    QueueUnavailable(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

/// Result type alias for claimcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Uses `SystemTime::now()` with fallback to 0 if the system clock is before
/// the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use claimcheck::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Timeout {
            operation: "web_search".to_string(),
            timeout_ms: 5000,
        };
        assert_eq!(err.to_string(), "operation 'web_search' timed out after 5000ms");

        let err = Error::RateLimited {
            provider: "anthropic".to_string(),
            retry_after_secs: Some(30),
        };
        assert_eq!(err.to_string(), "provider 'anthropic' is rate limited");
    }
}
