//! Bounded, TTL-expiring result cache.

use crate::config::CacheConfig;
use crate::extraction::ClaimKey;
use crate::models::{EvidenceItem, Verdict, VerificationResult};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::instrument;

/// A cached verdict for one normalized claim.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// SHA256 of the normalized claim text.
    pub key: String,
    /// Cached verdict.
    pub verdict: Verdict,
    /// Cached confidence (0-100).
    pub confidence: u8,
    /// Cached explanation.
    pub explanation: String,
    /// Evidence used when the verdict was produced.
    pub evidence: Vec<EvidenceItem>,
    /// Wall-clock creation time.
    pub created_at: DateTime<Utc>,
    /// Monotonic creation time used for expiry.
    inserted_at: Instant,
}

impl CacheEntry {
    /// Rebuilds a verification result for the given claim text.
    #[must_use]
    pub fn to_result(&self, claim: &str) -> VerificationResult {
        VerificationResult {
            claim: claim.to_string(),
            verdict: self.verdict,
            confidence: self.confidence,
            explanation: self.explanation.clone(),
            evidence: self.evidence.clone(),
            timestamp: self.created_at,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups that returned an entry.
    pub hits: u64,
    /// Lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Successful stores.
    pub stores: u64,
    /// Entries removed to make room.
    pub evictions: u64,
    /// Entries removed because their TTL passed.
    pub expirations: u64,
    /// Current entry count.
    pub size: usize,
    /// Configured maximum entry count.
    pub max_size: usize,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
}

/// Result cache keyed by normalized claim text.
///
/// # Eviction
///
/// Inserting into a full cache removes the single oldest-inserted entry.
/// Reads use `peek` and never refresh an entry's position, so eviction
/// follows insertion order rather than access order.
///
/// # Expiry
///
/// `get` never returns an entry older than the TTL. An expired entry found by
/// `get` is deleted and counted as a miss; `cleanup` removes the rest.
///
/// # Example
///
/// ```rust
/// use claimcheck::{ResultCache, Verdict};
/// use std::time::Duration;
///
/// let cache = ResultCache::new(100, Duration::from_secs(60));
/// cache.set("The Eiffel Tower is in Paris", Verdict::True, 90, "Matches.", Vec::new());
///
/// let entry = cache.get("the eiffel tower is in paris!");
/// assert_eq!(entry.map(|e| e.verdict), Some(Verdict::True));
/// ```
pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
    max_size: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ResultCache {
    /// Creates a cache. A `max_size` of zero is treated as one.
    #[must_use]
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
            max_size: capacity.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Creates a cache from configuration.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Returns the configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up a claim.
    #[must_use]
    pub fn get(&self, claim_text: &str) -> Option<CacheEntry> {
        self.get_at(claim_text, Instant::now())
    }

    #[instrument(skip(self, claim_text), fields(key = tracing::field::Empty))]
    pub(crate) fn get_at(&self, claim_text: &str, now: Instant) -> Option<CacheEntry> {
        let key = ClaimKey::of(claim_text);
        tracing::Span::current().record("key", ClaimKey::short(&key));

        let found = {
            let mut entries = self
                .entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            match entries.peek(&key) {
                Some(entry) if entry.is_expired(now, self.ttl) => {
                    entries.pop(&key);
                    self.expirations.fetch_add(1, Ordering::Relaxed);
                    metrics::gauge!("claim_cache_size").set(entries.len() as f64);
                    tracing::debug!("Cache entry expired");
                    None
                },
                Some(entry) => Some(entry.clone()),
                None => None,
            }
        };

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("claim_cache_hits_total").increment(1);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("claim_cache_misses_total").increment(1);
        }
        found
    }

    /// Whether a live entry exists. Does not touch the hit/miss counters.
    #[must_use]
    pub fn contains(&self, claim_text: &str) -> bool {
        let key = ClaimKey::of(claim_text);
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .peek(&key)
            .is_some_and(|entry| !entry.is_expired(now, self.ttl))
    }

    /// Stores a verdict. Last write wins for the same key.
    pub fn set(
        &self,
        claim_text: &str,
        verdict: Verdict,
        confidence: u8,
        explanation: &str,
        evidence: Vec<EvidenceItem>,
    ) {
        self.set_at(
            claim_text,
            verdict,
            confidence,
            explanation,
            evidence,
            Instant::now(),
        );
    }

    /// Stores a verification result under its claim text.
    pub fn store(&self, result: &VerificationResult) {
        self.set(
            &result.claim,
            result.verdict,
            result.confidence,
            &result.explanation,
            result.evidence.clone(),
        );
    }

    pub(crate) fn set_at(
        &self,
        claim_text: &str,
        verdict: Verdict,
        confidence: u8,
        explanation: &str,
        evidence: Vec<EvidenceItem>,
        now: Instant,
    ) {
        let key = ClaimKey::of(claim_text);
        let entry = CacheEntry {
            key: key.clone(),
            verdict,
            confidence: confidence.min(100),
            explanation: explanation.to_string(),
            evidence,
            created_at: Utc::now(),
            inserted_at: now,
        };

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some((displaced, _)) = entries.push(key.clone(), entry) {
            if displaced != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("claim_cache_evictions_total").increment(1);
                tracing::debug!(evicted = ClaimKey::short(&displaced), "Evicted oldest entry");
            }
        }
        self.stores.fetch_add(1, Ordering::Relaxed);
        metrics::gauge!("claim_cache_size").set(entries.len() as f64);
    }

    /// Removes all TTL-expired entries, returning how many were removed.
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub(crate) fn cleanup_at(&self, now: Instant) -> usize {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        let removed = expired.len();
        self.expirations
            .fetch_add(removed as u64, Ordering::Relaxed);
        metrics::gauge!("claim_cache_size").set(entries.len() as f64);
        drop(entries);

        if removed > 0 {
            tracing::info!(removed, "Removed expired cache entries");
        }
        removed
    }

    /// Returns the current entry count, including not-yet-swept expired entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64
        };
        CacheStats {
            hits,
            misses,
            stores: self.stores.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            size: self.len(),
            max_size: self.max_size,
            hit_rate,
        }
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
