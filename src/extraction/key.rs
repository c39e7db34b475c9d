//! Cache keys for claims.
//!
//! The key is a SHA256 hash of the normalized claim text, computed directly
//! from the text and never from the canonical tuple, so that two claims that
//! differ only in casing, whitespace, or trailing punctuation share a key even
//! when canonicalization is ambiguous.

use sha2::{Digest, Sha256};

/// Punctuation stripped from the end of a claim before hashing.
const TRAILING_PUNCTUATION: &[char] = &['.', '!', '?', ',', ';', ':', '\u{2026}'];

/// Cache key derivation for claim text.
///
/// # Normalization
///
/// Before hashing, text is:
/// - Converted to lowercase
/// - Whitespace-collapsed to single spaces and trimmed
/// - Stripped of trailing punctuation (`.`, `!`, `?`, `,`, `;`, `:`, `…`)
///
/// # Example
///
/// ```rust
/// use claimcheck::ClaimKey;
///
/// let key = ClaimKey::of("The Eiffel Tower is in Paris.");
/// assert_eq!(key.len(), 64);
/// assert_eq!(key, ClaimKey::of("  the eiffel   tower is in paris!! "));
/// ```
pub struct ClaimKey;

impl ClaimKey {
    /// Computes the lowercase hex SHA256 of the normalized claim text.
    #[must_use]
    pub fn of(text: &str) -> String {
        let normalized = Self::normalize(text);
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Normalizes claim text for hashing and deduplication.
    ///
    /// Idempotent: `normalize(normalize(x)) == normalize(x)`.
    #[must_use]
    pub fn normalize(text: &str) -> String {
        let mut normalized = text
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        loop {
            let stripped = normalized.trim_end_matches(TRAILING_PUNCTUATION).trim_end();
            if stripped.len() == normalized.len() {
                break;
            }
            normalized = stripped.to_string();
        }

        normalized
    }

    /// Shortened key for log fields.
    #[must_use]
    pub fn short(key: &str) -> &str {
        &key[..key.len().min(12)]
    }
}
