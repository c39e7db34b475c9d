//! Claim extraction and canonicalization.
//!
//! Both stages are pure functions of their input text: no I/O, no shared
//! state, and no failure mode beyond returning nothing.
//!
//! # Pipeline
//!
//! ```text
//! transcript ──► ClaimExtractor ──► CandidateClaim[] ──► Canonicalizer ──► CanonicalForm
//!                                        │
//!                                        └──► ClaimKey (cache key, from text only)
//! ```

mod canonical;
mod extractor;
mod key;
mod patterns;

pub use canonical::Canonicalizer;
pub use extractor::ClaimExtractor;
pub use key::ClaimKey;
pub(crate) use patterns::OWNERSHIP_RED_FLAG;
